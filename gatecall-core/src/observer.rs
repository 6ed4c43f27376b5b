//! # Lifecycle Observers
//!
//! A call reports its progress to a [`StreamObserver`] as a sequence of lifecycle events:
//! zero or more `on_next`, followed by exactly one terminal event (`on_error` or `on_completed`).
//!
//! [`CompositeObserver`] fans a single event stream out to two observers, so the caller's
//! response sink and the internal completion signal can both watch the same call without
//! knowing about each other.
use prost_reflect::DynamicMessage;
use tonic::Status;

/// Receives the lifecycle events of a single call.
///
/// Events are delivered from the transport's own task, never from the caller's.
pub trait StreamObserver<T>: Send {
    /// A value was received.
    ///
    /// Returning an error aborts the call: the transport stops reading and delivers the
    /// status back through [`StreamObserver::on_error`].
    fn on_next(&mut self, value: T) -> Result<(), Status>;

    /// The call failed. No further events follow.
    fn on_error(&mut self, status: Status);

    /// The call finished successfully. No further events follow.
    fn on_completed(&mut self);
}

/// Boxed observer handed to the transport.
pub type BoxObserver<T = DynamicMessage> = Box<dyn StreamObserver<T>>;

impl<T, O> StreamObserver<T> for Box<O>
where
    O: StreamObserver<T> + ?Sized,
{
    fn on_next(&mut self, value: T) -> Result<(), Status> {
        (**self).on_next(value)
    }

    fn on_error(&mut self, status: Status) {
        (**self).on_error(status)
    }

    fn on_completed(&mut self) {
        (**self).on_completed()
    }
}

/// Forwards every event to two observers, `first` then `second`, in receipt order.
pub struct CompositeObserver<A, B> {
    first: A,
    second: B,
}

impl<A, B> CompositeObserver<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<T, A, B> StreamObserver<T> for CompositeObserver<A, B>
where
    T: Clone,
    A: StreamObserver<T>,
    B: StreamObserver<T>,
{
    /// Both observers always see the value. If either rejects it, the first rejection is returned.
    fn on_next(&mut self, value: T) -> Result<(), Status> {
        let first = self.first.on_next(value.clone());
        let second = self.second.on_next(value);
        first.and(second)
    }

    fn on_error(&mut self, status: Status) {
        self.first.on_error(status.clone());
        self.second.on_error(status);
    }

    fn on_completed(&mut self) {
        self.first.on_completed();
        self.second.on_completed();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tonic::Code;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Next(u32),
        Error(Code),
        Completed,
    }

    /// Records events into a shared journal, tagged with the observer's name.
    struct Recorder {
        name: &'static str,
        journal: Arc<Mutex<Vec<(&'static str, Event)>>>,
        reject: Option<u32>,
    }

    impl Recorder {
        fn new(name: &'static str, journal: &Arc<Mutex<Vec<(&'static str, Event)>>>) -> Self {
            Self {
                name,
                journal: journal.clone(),
                reject: None,
            }
        }

        fn rejecting(mut self, value: u32) -> Self {
            self.reject = Some(value);
            self
        }
    }

    impl StreamObserver<u32> for Recorder {
        fn on_next(&mut self, value: u32) -> Result<(), Status> {
            self.journal
                .lock()
                .unwrap()
                .push((self.name, Event::Next(value)));
            match self.reject {
                Some(rejected) if rejected == value => {
                    Err(Status::internal(format!("{} rejected {value}", self.name)))
                }
                _ => Ok(()),
            }
        }

        fn on_error(&mut self, status: Status) {
            self.journal
                .lock()
                .unwrap()
                .push((self.name, Event::Error(status.code())));
        }

        fn on_completed(&mut self) {
            self.journal
                .lock()
                .unwrap()
                .push((self.name, Event::Completed));
        }
    }

    fn events_of(journal: &Arc<Mutex<Vec<(&'static str, Event)>>>, name: &str) -> Vec<Event> {
        journal
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, e)| e.clone())
            .collect()
    }

    #[test]
    fn test_forwards_every_event_to_both_in_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeObserver::new(
            Recorder::new("sink", &journal),
            Recorder::new("done", &journal),
        );

        composite.on_next(1).unwrap();
        composite.on_next(2).unwrap();
        composite.on_completed();

        let expected = vec![Event::Next(1), Event::Next(2), Event::Completed];
        assert_eq!(events_of(&journal, "sink"), expected);
        assert_eq!(events_of(&journal, "done"), expected);

        // Each event reaches both observers before the next one is forwarded.
        let names: Vec<_> = journal.lock().unwrap().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["sink", "done", "sink", "done", "sink", "done"]);
    }

    #[test]
    fn test_forwards_errors_to_both() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeObserver::new(
            Recorder::new("sink", &journal),
            Recorder::new("done", &journal),
        );

        composite.on_error(Status::unavailable("UNAVAILABLE"));

        assert_eq!(events_of(&journal, "sink"), vec![Event::Error(Code::Unavailable)]);
        assert_eq!(events_of(&journal, "done"), vec![Event::Error(Code::Unavailable)]);
    }

    #[test]
    fn test_rejection_still_reaches_the_other_observer() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeObserver::new(
            Recorder::new("sink", &journal).rejecting(7),
            Recorder::new("done", &journal),
        );

        let err = composite.on_next(7).unwrap_err();

        assert_eq!(err.code(), Code::Internal);
        assert_eq!(err.message(), "sink rejected 7");
        assert_eq!(events_of(&journal, "done"), vec![Event::Next(7)]);
    }

    #[test]
    fn test_first_rejection_wins() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeObserver::new(
            Recorder::new("sink", &journal).rejecting(3),
            Recorder::new("done", &journal).rejecting(3),
        );

        let err = composite.on_next(3).unwrap_err();

        assert_eq!(err.message(), "sink rejected 3");
    }

    fn drive(observer: &mut impl StreamObserver<u32>) {
        observer.on_next(1).unwrap();
        observer.on_next(2).unwrap();
        observer.on_completed();
    }

    fn alone(name: &'static str) -> Vec<Event> {
        let journal = Arc::new(Mutex::new(Vec::new()));
        drive(&mut Recorder::new(name, &journal));
        events_of(&journal, name)
    }

    #[test]
    fn test_removing_either_observer_keeps_the_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeObserver::new(
            Recorder::new("sink", &journal),
            Recorder::new("done", &journal),
        );
        drive(&mut composite);

        assert_eq!(events_of(&journal, "sink"), alone("sink"));
        assert_eq!(events_of(&journal, "done"), alone("done"));
    }
}
