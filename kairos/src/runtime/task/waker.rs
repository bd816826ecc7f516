use crate::runtime::task::core::Core;

use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Returns the `RawWakerVTable` for a task of type `T`.
///
/// Waking a task requests a resumption step on its own dispatcher
/// ([`Core::schedule`]).
fn vtable<T: Send + Sync + 'static>() -> &'static RawWakerVTable {
    &RawWakerVTable::new(
        clone_raw::<T>,
        wake_raw::<T>,
        wake_by_ref_raw::<T>,
        drop_raw::<T>,
    )
}

/// Creates a [`Waker`] that resumes `task` when woken.
///
/// # Safety
///
/// The pointer stored inside the `RawWaker` originates from
/// `Arc::into_raw` and every vtable entry below keeps the reference count
/// balanced.
pub(crate) fn make_waker<T: Send + Sync + 'static>(task: Arc<Core<T>>) -> Waker {
    unsafe {
        Waker::from_raw(RawWaker::new(
            Arc::into_raw(task) as *const (),
            vtable::<T>(),
        ))
    }
}

fn clone_raw<T: Send + Sync + 'static>(ptr: *const ()) -> RawWaker {
    let arc = unsafe { Arc::<Core<T>>::from_raw(ptr as *const Core<T>) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable::<T>())
}

fn wake_raw<T: Send + Sync + 'static>(ptr: *const ()) {
    let arc = unsafe { Arc::<Core<T>>::from_raw(ptr as *const Core<T>) };
    arc.schedule();
}

fn wake_by_ref_raw<T: Send + Sync + 'static>(ptr: *const ()) {
    let arc = unsafe { Arc::<Core<T>>::from_raw(ptr as *const Core<T>) };
    arc.schedule();
    mem::forget(arc);
}

fn drop_raw<T: Send + Sync + 'static>(ptr: *const ()) {
    unsafe { Arc::<Core<T>>::from_raw(ptr as *const Core<T>) };
}

/// Latest waker of a future waiting on a task's completion.
///
/// A waiting future registers one completion callback holding this slot
/// and refreshes the waker on every poll, so repeated polls never pile up
/// callbacks on the awaited task.
pub(crate) struct WakerSlot {
    waker: Mutex<Option<Waker>>,
}

impl WakerSlot {
    pub(crate) fn new(waker: &Waker) -> Self {
        Self {
            waker: Mutex::new(Some(waker.clone())),
        }
    }

    pub(crate) fn update(&self, waker: &Waker) {
        let mut slot = self.waker.lock();
        match slot.as_ref() {
            Some(current) if current.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        }
    }

    pub(crate) fn wake(&self) {
        let waker = self.waker.lock().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}
