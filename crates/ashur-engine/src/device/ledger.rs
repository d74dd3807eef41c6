use super::BackendError;

/// Video-memory accounting against a fixed budget.
///
/// Neither wgpu nor the headless backend can query free VRAM, so both track
/// their own allocations here.
#[derive(Debug, Clone)]
pub struct VramLedger {
    budget: u64,
    used: u64,
}

impl VramLedger {
    pub fn new(budget: u64) -> Self {
        Self { budget, used: 0 }
    }

    #[inline]
    pub fn budget(&self) -> u64 {
        self.budget
    }

    #[inline]
    pub fn used(&self) -> u64 {
        self.used
    }

    #[inline]
    pub fn free(&self) -> u64 {
        self.budget.saturating_sub(self.used)
    }

    pub fn reserve(&mut self, bytes: u64) -> Result<(), BackendError> {
        if bytes > self.free() {
            return Err(BackendError::OutOfMemory {
                requested: bytes,
                free: self.free(),
            });
        }
        self.used += bytes;
        Ok(())
    }

    pub fn release(&mut self, bytes: u64) {
        debug_assert!(bytes <= self.used, "releasing more VRAM than reserved");
        self.used = self.used.saturating_sub(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_fails_past_budget() {
        let mut ledger = VramLedger::new(100);
        ledger.reserve(60).unwrap();
        let err = ledger.reserve(50).unwrap_err();
        assert!(err.is_out_of_memory());
        assert_eq!(ledger.free(), 40);

        ledger.release(60);
        assert_eq!(ledger.free(), 100);
    }
}
