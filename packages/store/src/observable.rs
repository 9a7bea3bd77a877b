//! A single-threaded value with change notification.
//!
//! Both client-side stores keep their state in an [`Observable`]. The UI subscribes once
//! and mirrors every update into its own reactive signal; tests read the value directly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: RefCell<T>,
    observers: RefCell<Vec<(u64, Callback<T>)>>,
    next_id: Cell<u64>,
}

/// Shared, observable state. Clones refer to the same value.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Mutate the value, then notify every observer.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.borrow_mut());
        self.notify();
        result
    }

    /// Call `observer` after every update until the returned handle is dropped.
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Observer {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));

        let inner = Rc::downgrade(&self.inner);
        Observer {
            detach: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.observers.borrow_mut().retain(|(i, _)| *i != id);
                }
            })),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    fn notify(&self) {
        let snapshot = self.get();
        let observers: Vec<Callback<T>> = self
            .inner
            .observers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

/// Registration returned by [`Observable::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping an observer unsubscribes immediately"]
pub struct Observer {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Observer {
    pub fn unsubscribe(self) {}
}

impl Drop for Observer {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observers_see_every_update_until_dropped() {
        let value = Observable::new(0u32);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let observer = value.subscribe(move |v| sink.borrow_mut().push(*v));
        value.update(|v| *v = 1);
        value.update(|v| *v += 1);
        assert_eq!(*seen.borrow(), [1, 2]);

        observer.unsubscribe();
        value.update(|v| *v = 10);
        assert_eq!(*seen.borrow(), [1, 2]);
        assert_eq!(value.get(), 10);
        assert_eq!(value.observer_count(), 0);
    }

    #[test]
    fn observer_may_read_during_notification() {
        let value = Observable::new(String::from("a"));
        let reader = value.clone();
        let _observer = value.subscribe(move |v| assert_eq!(reader.get(), *v));
        value.update(|v| v.push('b'));
    }
}
