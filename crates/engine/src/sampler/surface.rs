//! The rendered UI, as seen by the sampler
//!
//! Browser drivers implement `Surface`; `ScriptedSurface` is an in-memory
//! page for tests and dry runs.

use super::Locator;
use async_trait::async_trait;
use reconciler_core::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Read-only view of the page
#[async_trait]
pub trait Surface: Send + Sync {
    /// Visible text of the element, `None` when it is not on the page
    async fn read_text(&self, locator: &Locator) -> Result<Option<String>>;

    /// Whether the element accepts clicks, `None` when it is not on the page
    async fn is_enabled(&self, locator: &Locator) -> Result<Option<bool>>;
}

#[derive(Debug)]
struct Element {
    text: String,
    /// Texts shown on subsequent reads, oldest first
    upcoming: VecDeque<String>,
    enabled: bool,
}

/// In-memory surface whose elements can change while a scenario runs.
///
/// Queued texts are consumed one per `read_text`; the last one sticks.
#[derive(Debug, Default)]
pub struct ScriptedSurface {
    elements: Mutex<HashMap<Locator, Element>>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_elements<T>(&self, f: impl FnOnce(&mut HashMap<Locator, Element>) -> T) -> Result<T> {
        let mut elements = self
            .elements
            .lock()
            .map_err(|_| Error::InvalidData("scripted surface lock poisoned".to_string()))?;
        Ok(f(&mut elements))
    }

    /// Show (or replace) an enabled element with `text`
    pub fn set_text(&self, locator: Locator, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.with_elements(|elements| {
            let element = elements.entry(locator).or_insert_with(|| Element {
                text: String::new(),
                upcoming: VecDeque::new(),
                enabled: true,
            });
            element.text = text;
            element.upcoming.clear();
        })
    }

    /// Queue texts the element will show on the following reads
    pub fn queue_texts<I, S>(&self, locator: &Locator, texts: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        self.with_elements(|elements| match elements.get_mut(locator) {
            Some(element) => {
                element.upcoming.extend(texts);
                Ok(())
            }
            None => Err(Error::InvalidData(format!("no scripted element {}", locator))),
        })?
    }

    pub fn set_enabled(&self, locator: &Locator, enabled: bool) -> Result<()> {
        self.with_elements(|elements| match elements.get_mut(locator) {
            Some(element) => {
                element.enabled = enabled;
                Ok(())
            }
            None => Err(Error::InvalidData(format!("no scripted element {}", locator))),
        })?
    }

    /// Take the element off the page
    pub fn remove(&self, locator: &Locator) -> Result<()> {
        self.with_elements(|elements| {
            elements.remove(locator);
        })
    }
}

#[async_trait]
impl Surface for ScriptedSurface {
    async fn read_text(&self, locator: &Locator) -> Result<Option<String>> {
        self.with_elements(|elements| {
            elements.get_mut(locator).map(|element| {
                if let Some(next) = element.upcoming.pop_front() {
                    element.text = next;
                }
                element.text.clone()
            })
        })
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<Option<bool>> {
        self.with_elements(|elements| elements.get(locator).map(|element| element.enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_texts_advance_then_stick() {
        let surface = ScriptedSurface::new();
        let balance = Locator::id("balance");
        surface.set_text(balance.clone(), "Balance: 100.00").unwrap();
        surface.queue_texts(&balance, ["Balance: 120.00", "Balance: 150.00"]).unwrap();

        assert_eq!(surface.read_text(&balance).await.unwrap().unwrap(), "Balance: 120.00");
        assert_eq!(surface.read_text(&balance).await.unwrap().unwrap(), "Balance: 150.00");
        assert_eq!(surface.read_text(&balance).await.unwrap().unwrap(), "Balance: 150.00");
    }

    #[tokio::test]
    async fn test_absent_and_disabled_elements() {
        let surface = ScriptedSurface::new();
        let button = Locator::css(".claim");
        assert_eq!(surface.read_text(&button).await.unwrap(), None);
        assert!(surface.set_enabled(&button, false).is_err());

        surface.set_text(button.clone(), "Claim").unwrap();
        surface.set_enabled(&button, false).unwrap();
        assert_eq!(surface.is_enabled(&button).await.unwrap(), Some(false));

        surface.remove(&button).unwrap();
        assert_eq!(surface.is_enabled(&button).await.unwrap(), None);
    }
}
