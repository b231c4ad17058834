//! The push-side contract.

use crate::error::Error;
use std::sync::Arc;

/// Callback-style stream contract owned by an external producer.
///
/// Every method may be invoked from any thread at any time. After `fail` or
/// `finish`, further calls are ignored by implementations in this crate.
pub trait PushHandle<T>: Send + Sync {
    /// Deliver one element.
    fn deliver(&self, item: T);

    /// Terminate the stream with an error.
    fn fail(&self, error: Error);

    /// Terminate the stream normally.
    fn finish(&self);
}

impl<T, H> PushHandle<T> for Arc<H>
where
    H: PushHandle<T> + ?Sized,
{
    fn deliver(&self, item: T) {
        (**self).deliver(item)
    }

    fn fail(&self, error: Error) {
        (**self).fail(error)
    }

    fn finish(&self) {
        (**self).finish()
    }
}

impl<T, H> PushHandle<T> for Box<H>
where
    H: PushHandle<T> + ?Sized,
{
    fn deliver(&self, item: T) {
        (**self).deliver(item)
    }

    fn fail(&self, error: Error) {
        (**self).fail(error)
    }

    fn finish(&self) {
        (**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl PushHandle<u32> for Recorder {
        fn deliver(&self, item: u32) {
            self.calls.lock().unwrap().push(format!("deliver {item}"));
        }

        fn fail(&self, error: Error) {
            self.calls.lock().unwrap().push(format!("fail {error}"));
        }

        fn finish(&self) {
            self.calls.lock().unwrap().push("finish".to_string());
        }
    }

    #[test]
    fn test_arc_and_box_forward() {
        let recorder = Arc::new(Recorder::default());
        let boxed: Box<dyn PushHandle<u32>> = Box::new(Arc::clone(&recorder));

        boxed.deliver(7);
        recorder.finish();
        Arc::clone(&recorder).fail(Error::Cancelled);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec!["deliver 7", "finish", "fail stream cancelled"]
        );
    }
}
