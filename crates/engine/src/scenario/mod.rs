//! Explicit ordered scenarios
//!
//! A scenario is a list of named async steps over a shared context. Steps
//! run in insertion order and the first failure skips the rest, so a later
//! step can rely on state an earlier one established.

mod reconcile;

pub use reconcile::*;

use reconciler_core::Result;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Future returned by a step, borrowing the context for its duration
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

type StepFn<C> = Box<dyn for<'a> Fn(&'a mut C) -> StepFuture<'a>>;

#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Passed,
    Failed(String),
    /// An earlier step failed
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepReport>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Passed)
    }

    /// The step that stopped the scenario
    pub fn failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    pub fn duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed() { "PASSED" } else { "FAILED" };
        writeln!(f, "{} {} ({:.1}s)", verdict, self.name, self.duration().as_secs_f64())?;
        for (i, step) in self.steps.iter().enumerate() {
            match &step.status {
                StepStatus::Passed => writeln!(f, "  {:>2}. ok    {}", i + 1, step.name)?,
                StepStatus::Failed(reason) => writeln!(f, "  {:>2}. FAIL  {}: {}", i + 1, step.name, reason)?,
                StepStatus::Skipped => writeln!(f, "  {:>2}. skip  {}", i + 1, step.name)?,
            }
        }
        Ok(())
    }
}

pub struct Scenario<C> {
    name: String,
    steps: Vec<(String, StepFn<C>)>,
}

impl<C> Scenario<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step. Write it as `|ctx| Box::pin(async move { ... })`.
    pub fn step<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> StepFuture<'a> + 'static,
    {
        self.steps.push((name.into(), Box::new(f)));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(&self, ctx: &mut C) -> ScenarioReport {
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut failed = false;

        for (name, step) in &self.steps {
            if failed {
                steps.push(StepReport {
                    name: name.clone(),
                    status: StepStatus::Skipped,
                    duration: Duration::ZERO,
                });
                continue;
            }

            let start = Instant::now();
            let status = match step(ctx).await {
                Ok(()) => {
                    info!("[{}] {} passed", self.name, name);
                    StepStatus::Passed
                }
                Err(e) => {
                    error!("[{}] {} failed: {}", self.name, name, e);
                    failed = true;
                    StepStatus::Failed(e.to_string())
                }
            };
            steps.push(StepReport {
                name: name.clone(),
                status,
                duration: start.elapsed(),
            });
        }

        ScenarioReport {
            name: self.name.clone(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconciler_core::Error;

    #[derive(Default)]
    struct Ctx {
        log: Vec<&'static str>,
        password: String,
    }

    #[tokio::test]
    async fn test_steps_run_in_order_sharing_state() {
        let scenario = Scenario::new("password change")
            .step("change password", |ctx: &mut Ctx| {
                Box::pin(async move {
                    ctx.password = "new-pass".into();
                    ctx.log.push("change");
                    Ok(())
                })
            })
            .step("log in with new password", |ctx: &mut Ctx| {
                Box::pin(async move {
                    ctx.log.push("login");
                    if ctx.password == "new-pass" {
                        Ok(())
                    } else {
                        Err(Error::AuthenticationError("old password still active".into()))
                    }
                })
            });

        let mut ctx = Ctx::default();
        let report = scenario.run(&mut ctx).await;
        assert!(report.passed());
        assert_eq!(ctx.log, vec!["change", "login"]);
    }

    #[tokio::test]
    async fn test_first_failure_skips_the_rest() {
        let scenario = Scenario::new("deposit")
            .step("provision", |ctx: &mut Ctx| {
                Box::pin(async move {
                    ctx.log.push("provision");
                    Ok(())
                })
            })
            .step("deposit", |_ctx: &mut Ctx| {
                Box::pin(async move { Err(Error::ApiError("HTTP 502".into())) })
            })
            .step("verify", |ctx: &mut Ctx| {
                Box::pin(async move {
                    ctx.log.push("verify");
                    Ok(())
                })
            });

        let mut ctx = Ctx::default();
        let report = scenario.run(&mut ctx).await;
        assert!(!report.passed());
        assert_eq!(report.failure().map(|s| s.name.as_str()), Some("deposit"));
        assert_eq!(report.steps[2].status, StepStatus::Skipped);
        assert_eq!(ctx.log, vec!["provision"]);
        assert!(report.to_string().contains("FAIL  deposit: API request failed: HTTP 502"));
    }
}
