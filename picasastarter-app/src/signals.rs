use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const IDLE: u8 = 0;
const LAUNCHED: u8 = 1;
const BACKING_UP: u8 = 2;

/// Routes Ctrl-C according to what the app is doing.
///
/// While a backup runs, Ctrl-C cancels it; while Picasa runs it is ignored so
/// the virtual drive still gets removed; otherwise the process exits.
#[derive(Clone, Debug)]
pub struct Interrupts {
    phase: Arc<AtomicU8>,
    cancel: Arc<AtomicBool>,
}

impl Interrupts {
    /// Must be called from within the tokio runtime.
    pub fn install() -> Self {
        let me = Self {
            phase: Arc::new(AtomicU8::new(IDLE)),
            cancel: Arc::new(AtomicBool::new(false)),
        };
        let watcher = me.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                watcher.on_interrupt();
            }
        });
        me
    }

    fn on_interrupt(&self) {
        match self.phase.load(Ordering::SeqCst) {
            BACKING_UP => {
                info!("cancelling backup");
                self.cancel.store(true, Ordering::SeqCst);
            }
            LAUNCHED => warn!("waiting for Picasa to close"),
            _ => std::process::exit(130),
        }
    }

    /// Fresh cancel flag for a backup.
    pub fn begin_backup(&self) -> Arc<AtomicBool> {
        self.cancel.store(false, Ordering::SeqCst);
        self.phase.store(BACKING_UP, Ordering::SeqCst);
        self.cancel.clone()
    }

    /// Drops an interrupt that arrived while the user was still choosing a
    /// database; only interrupts during the work itself cancel it.
    pub fn selection_done(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    pub fn begin_launch(&self) -> Arc<AtomicBool> {
        self.cancel.store(false, Ordering::SeqCst);
        self.phase.store(LAUNCHED, Ordering::SeqCst);
        self.cancel.clone()
    }

    pub fn idle(&self) {
        self.phase.store(IDLE, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached() -> Interrupts {
        Interrupts {
            phase: Arc::new(AtomicU8::new(IDLE)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn interrupt_during_backup_sets_the_flag() {
        let irq = detached();
        let flag = irq.begin_backup();
        irq.on_interrupt();
        assert!(flag.load(Ordering::SeqCst));

        // A later backup starts clean.
        irq.idle();
        assert!(!irq.begin_backup().load(Ordering::SeqCst));
    }

    #[test]
    fn interrupt_while_choosing_does_not_cancel_the_copy() {
        let irq = detached();
        let flag = irq.begin_backup();
        irq.on_interrupt();
        irq.selection_done();
        assert!(!flag.load(Ordering::SeqCst));

        irq.on_interrupt();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn interrupt_while_picasa_runs_is_ignored() {
        let irq = detached();
        let flag = irq.begin_launch();
        irq.on_interrupt();
        assert!(!flag.load(Ordering::SeqCst));
    }
}
