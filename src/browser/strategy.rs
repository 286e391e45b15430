// src/browser/strategy.rs
//! Ordered fallback strategies.
//!
//! A chain is a list of named `(locator, action)` steps. Steps run in order
//! until one succeeds; the outcome says which one did, or that all of them
//! were tried.

use super::{BrowserDriver, KeyStroke, Locator};
use std::time::Duration;

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Wait for the element, then click it.
    Click(Locator),
    /// Press a key on whatever has focus.
    Press(KeyStroke),
    /// Load a URL.
    Navigate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub action: Action,
}

/// Result of running a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Index of the step that succeeded.
    Succeeded { step: usize },
    /// Every step failed; their names in the order tried.
    Exhausted { attempted: Vec<String> },
}

impl ChainOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ChainOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyChain {
    steps: Vec<Step>,
    wait: Duration,
}

impl StrategyChain {
    /// An empty chain whose click steps wait up to `wait` for their element.
    pub fn new(wait: Duration) -> Self {
        Self {
            steps: Vec::new(),
            wait,
        }
    }

    pub fn then(mut self, name: impl Into<String>, action: Action) -> Self {
        self.steps.push(Step {
            name: name.into(),
            action,
        });
        self
    }

    /// One click step per selector, named after the selector.
    pub fn clicking_any(wait: Duration, selectors: &[&str]) -> Self {
        selectors.iter().fold(Self::new(wait), |chain, selector| {
            chain.then(*selector, Action::Click(Locator::css(*selector)))
        })
    }

    /// The locator of a click step.
    pub fn locator(&self, step: usize) -> Option<&Locator> {
        match self.steps.get(step).map(|s| &s.action) {
            Some(Action::Click(locator)) => Some(locator),
            _ => None,
        }
    }

    /// Runs the steps in order until one succeeds.
    pub async fn run<D: BrowserDriver + ?Sized>(&self, driver: &D) -> ChainOutcome {
        let mut attempted = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            match self.perform(driver, &step.action).await {
                Ok(true) => {
                    log::debug!("Strategy '{}' succeeded", step.name);
                    return ChainOutcome::Succeeded { step: index };
                }
                Ok(false) => log::debug!("Strategy '{}': element not present", step.name),
                Err(e) => log::debug!("Strategy '{}' failed: {}", step.name, e),
            }
            attempted.push(step.name.clone());
        }
        log::warn!("All strategies exhausted: {}", attempted.join(", "));
        ChainOutcome::Exhausted { attempted }
    }

    async fn perform<D: BrowserDriver + ?Sized>(
        &self,
        driver: &D,
        action: &Action,
    ) -> Result<bool, crate::error::AppError> {
        match action {
            Action::Click(locator) => {
                if !driver.wait_for(locator, self.wait).await? {
                    return Ok(false);
                }
                driver.click(locator).await?;
            }
            Action::Press(key) => driver.press(*key).await?,
            Action::Navigate(url) => driver.goto(url).await?,
        }
        Ok(true)
    }
}
