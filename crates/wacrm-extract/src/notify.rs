use crate::error::Result;
use std::cell::RefCell;
use wacrm_core::Emission;

/// Downstream consumer of extracted identifiers.
pub trait Notifier {
    fn notify(&self, emission: &Emission) -> Result<()>;
}

/// Keeps every emission in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    emissions: RefCell<Vec<Emission>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.emissions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.borrow().is_empty()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, emission: &Emission) -> Result<()> {
        self.emissions.borrow_mut().push(emission.clone());
        Ok(())
    }
}
