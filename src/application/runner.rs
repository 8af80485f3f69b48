//! Main processing loop over the command line sources

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::application::skimmer::Skimmer;
use crate::application::sources::{MetadataSource, open_source};
use crate::domain::metadata::Metadata;
use crate::infrastructure::logging::report_warning;
use crate::infrastructure::transport::Transport;

const INTERRUPTED_MESSAGE: &str = "The user interrupted the operation of the application.";

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    NoArguments,
    Warning,
    Error,
    KeyboardInterrupt,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NoArguments => 1,
            Self::Warning => 2,
            Self::Error => 3,
            Self::KeyboardInterrupt => 127,
        }
    }
}

pub struct Runner<T> {
    skimmer: Skimmer<T>,
    interrupted: Arc<AtomicBool>,
}

impl<T: Transport> Runner<T> {
    pub fn new(skimmer: Skimmer<T>) -> Self {
        Self {
            skimmer,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with the interrupt handler; setting it stops the run at the next address.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Process every source in order and report the resulting status.
    pub async fn run<S: AsRef<str>>(&self, sources: &[S]) -> ExitStatus {
        let mut status = ExitStatus::Success;
        for argument in sources {
            if self.is_interrupted() {
                return self.interrupted_status();
            }
            let argument = argument.as_ref();
            info!("Source: {argument}");
            let mut source = match open_source(argument) {
                Ok(source) => source,
                Err(error) => {
                    report_warning(&error.to_string());
                    if let Some(details) = error.details() {
                        debug!("{details}");
                    }
                    status = ExitStatus::Warning;
                    continue;
                }
            };

            let completed = self.process_source(source.as_mut(), &mut status).await;
            if let Err(error) = source.finish() {
                report_warning(&error.to_string());
                status = ExitStatus::Warning;
            }
            if !completed {
                return self.interrupted_status();
            }
        }
        status
    }

    /// Returns `false` when interrupted before the source was exhausted.
    async fn process_source(&self, source: &mut dyn MetadataSource, status: &mut ExitStatus) -> bool {
        while let Some(entry) = source.next_entry() {
            if self.is_interrupted() {
                return false;
            }
            info!("{}", entry.address);
            let metadata = match self.skimmer.extract(&entry.address).await {
                Ok(metadata) => metadata,
                Err(error) => {
                    report_warning(&error.to_string());
                    if let Some(details) = error.details() {
                        debug!("{details}");
                    }
                    *status = ExitStatus::Warning;
                    Metadata::new()
                }
            };
            if let Err(error) = source.store(&entry, &metadata) {
                report_warning(&error.to_string());
                *status = ExitStatus::Warning;
            }
        }
        true
    }

    fn interrupted_status(&self) -> ExitStatus {
        report_warning(INTERRUPTED_MESSAGE);
        ExitStatus::KeyboardInterrupt
    }
}
