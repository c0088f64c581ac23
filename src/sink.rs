//! Downstream document sink (spec §1 external collaborator
//! `DocumentAcceptor`, §5 "Resource lifecycle", §8 "Shutdown safety").
use crate::document::Document;

/// The capability the traverser and lister submit documents through. A real
/// deployment backs this with the connector framework's feed pusher; this
/// crate only depends on the interface.
pub trait DocumentAcceptor: Send + Sync {
    /// Submits one document. May block for backpressure (spec §5
    /// "Suspension points"). The sink is contractually obliged to close any
    /// content stream it reads from the document.
    fn take(&self, document: Document) -> Result<(), SinkError>;

    /// Flushes buffered documents. Called in a finally-equivalent at the
    /// end of every traversal cycle, even on failure (spec §4.7 step 9).
    fn flush(&self) -> Result<(), SinkError>;

    /// Cancels in-flight work. Called exactly once during shutdown (spec
    /// §8 "Shutdown safety").
    fn cancel(&self);
}

#[derive(Debug, thiserror::Error)]
#[error("document sink error: {0}")]
pub struct SinkError(pub String);

#[cfg(test)]
pub mod testing {
    use super::{Document, DocumentAcceptor, SinkError};
    use std::sync::Mutex;

    /// An in-memory sink recording every docid it receives, in arrival
    /// order. Used by the crate's own tests and available to downstream
    /// integration tests.
    #[derive(Default)]
    pub struct RecordingSink {
        docids: Mutex<Vec<String>>,
        flushes: Mutex<usize>,
        cancelled: Mutex<bool>,
    }

    impl RecordingSink {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn docids(&self) -> Vec<String> {
            self.docids.lock().unwrap().clone()
        }

        #[must_use]
        pub fn flush_count(&self) -> usize {
            *self.flushes.lock().unwrap()
        }

        #[must_use]
        pub fn is_cancelled(&self) -> bool {
            *self.cancelled.lock().unwrap()
        }
    }

    impl DocumentAcceptor for RecordingSink {
        fn take(&self, document: Document) -> Result<(), SinkError> {
            self.docids.lock().unwrap().push(document.docid().to_string());
            Ok(())
        }

        fn flush(&self) -> Result<(), SinkError> {
            *self.flushes.lock().unwrap() += 1;
            Ok(())
        }

        fn cancel(&self) {
            *self.cancelled.lock().unwrap() = true;
        }
    }
}
