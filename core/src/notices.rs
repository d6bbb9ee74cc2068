use std::cell::RefCell;
use std::rc::Rc;

use crate::models::Notice;

type Listener = Rc<dyn Fn(Notice)>;

#[derive(Default)]
struct Inner {
    queued: RefCell<Vec<Notice>>,
    listener: RefCell<Option<Listener>>,
}

/// Shared outlet for toasts. Every controller built from the same notifier
/// reports to the same place; without a listener notices are queued until
/// [`Notifier::take`] drains them.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Rc<Inner>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listener(&self, listener: impl Fn(Notice) + 'static) {
        *self.inner.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn push(&self, notice: Notice) {
        let listener = self.inner.listener.borrow().clone();
        match listener {
            Some(listener) => listener(notice),
            None => self.inner.queued.borrow_mut().push(notice),
        }
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.inner.queued.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoticeKind;

    #[test]
    fn queues_until_a_listener_is_set() {
        let notifier = Notifier::new();
        let shared = notifier.clone();
        shared.push(Notice::info("Queued", "first"));
        assert_eq!(notifier.take().len(), 1);
        assert!(notifier.take().is_empty());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        notifier.set_listener(move |n| sink.borrow_mut().push(n.kind));
        shared.push(Notice::warning("Live", "second"));
        assert_eq!(*seen.borrow(), [NoticeKind::Warning]);
        assert!(notifier.take().is_empty());
    }
}
