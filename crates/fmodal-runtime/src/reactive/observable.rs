#![forbid(unsafe_code)]

//! Version-tracked shared values with subscriber callbacks.
//!
//! # Usage
//!
//! ```
//! use fmodal_runtime::reactive::Observable;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let count = Observable::new(0);
//! let seen = Rc::new(Cell::new(0));
//! let s = Rc::clone(&seen);
//! let _sub = count.subscribe(move |v| s.set(*v));
//!
//! count.set(5);
//! assert_eq!(seen.get(), 5);
//! assert_eq!(count.version(), 1);
//! ```
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates to the caller of `set()`. The new value and
//!   version are already committed at that point.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared, version-tracked value.
///
/// Cloning an `Observable` produces another handle to the same value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
            Self::live_callbacks(&mut inner)
        };
        Self::notify(callbacks);
        true
    }

    /// Mutate the value in place, notifying subscribers if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Current version counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Register a callback invoked with the new value after each change.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription {
            _callback: Box::new(callback),
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn live_callbacks(inner: &mut ObservableInner<T>) -> (T, Vec<Rc<Callback<T>>>) {
        inner.subscribers.retain(|weak| weak.strong_count() > 0);
        let callbacks = inner.subscribers.iter().filter_map(Weak::upgrade).collect();
        (inner.value.clone(), callbacks)
    }

    fn notify((value, callbacks): (T, Vec<Rc<Callback<T>>>)) {
        for callback in callbacks {
            callback(&value);
        }
    }
}

/// RAII guard for an [`Observable`] subscription.
///
/// Dropping the guard removes the callback.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn new_starts_at_version_zero() {
        let obs = Observable::new(3);
        assert_eq!(obs.get(), 3);
        assert_eq!(obs.version(), 0);
    }

    #[test]
    fn set_bumps_version_once() {
        let obs = Observable::new(1);
        assert!(obs.set(2));
        assert_eq!(obs.version(), 1);
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn set_equal_is_noop() {
        let obs = Observable::new(1);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let _sub = obs.subscribe(move |_| c.set(c.get() + 1));

        assert!(!obs.set(1));
        assert_eq!(obs.version(), 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn subscribers_notified_in_order() {
        let obs = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = Rc::clone(&log);
        let _s1 = obs.subscribe(move |v| l1.borrow_mut().push(("first", *v)));
        let l2 = Rc::clone(&log);
        let _s2 = obs.subscribe(move |v| l2.borrow_mut().push(("second", *v)));

        obs.set(7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let sub = obs.subscribe(move |v| s.set(*v));

        obs.set(1);
        assert_eq!(seen.get(), 1);
        assert_eq!(obs.subscriber_count(), 1);

        drop(sub);
        obs.set(2);
        assert_eq!(seen.get(), 1, "callback should not fire after drop");
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn callback_may_read_and_write_same_observable() {
        let obs = Observable::new(0);
        let reader = obs.clone();
        let _sub = obs.subscribe(move |v| {
            if *v < 3 {
                reader.set(reader.get() + 1);
            }
        });

        obs.set(1);
        assert_eq!(obs.get(), 3);
    }

    #[test]
    fn update_in_place() {
        let obs = Observable::new(vec![1, 2]);
        assert!(obs.update(|v| v.push(3)));
        assert_eq!(obs.get(), vec![1, 2, 3]);
        assert!(!obs.update(|_| {}));
    }

    #[test]
    fn update_counter_notifies_with_new_value() {
        let counter = Observable::new(0u64);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = counter.subscribe(move |v| s.borrow_mut().push(*v));

        counter.update(|v| *v += 1);
        counter.update(|v| *v += 1);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(counter.version(), 2);
    }

    #[test]
    fn clone_shares_state() {
        let a = Observable::new(String::from("a"));
        let b = a.clone();
        b.set("b".to_string());
        assert_eq!(a.get(), "b");
        assert_eq!(a.version(), 1);
    }

    #[test]
    fn debug_format() {
        let obs = Observable::new(42);
        let debug = format!("{obs:?}");
        assert!(debug.contains("value: 42"));
        assert!(debug.contains("version: 0"));
    }

    proptest::proptest! {
        #[test]
        fn version_counts_value_changes(values in proptest::collection::vec(0u8..4, 0..32)) {
            let obs = Observable::new(0u8);
            let mut expected = 0u64;
            let mut current = 0u8;
            for v in values {
                if v != current {
                    expected += 1;
                    current = v;
                }
                obs.set(v);
            }
            proptest::prop_assert_eq!(obs.version(), expected);
            proptest::prop_assert_eq!(obs.get(), current);
        }
    }
}
