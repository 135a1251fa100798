// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! The macOS task executor.
//!
//! Main-queue tasks wait in our own FIFO. For each one, a small runner object
//! is asked to perform `runTask` on the main thread, which runs the oldest
//! waiting task. A main thread waiting for the queue runs the FIFO directly.

#![allow(non_snake_case)]

use std::collections::VecDeque;
use std::ffi::c_void;
use std::mem;
use std::sync::{Arc, Mutex};

use cocoa::base::{id, nil, NO};
use cocoa::foundation::NSAutoreleasePool;
use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel};
use objc::{class, msg_send, sel, sel_impl};
use once_cell::sync::Lazy;

use crate::backend::shared::{MainThreadDispatch, ThreadPoolTaskExecutor};
use crate::common_util::run_next;
use crate::error::Error;
use crate::tasks::{ExecutorConfig, Task};

type Pending = Mutex<VecDeque<Task>>;

/// Holds an `Arc<Pending>` leaked with `Arc::into_raw`.
const PENDING_IVAR: &str = "pendingTasks";

// Wrap pointer because a static requires Sync.
struct RunnerClass(*const Class);
unsafe impl Send for RunnerClass {}
unsafe impl Sync for RunnerClass {}

static RUNNER_CLASS: Lazy<Option<RunnerClass>> = Lazy::new(|| unsafe {
    // Every plugin binary in the process carries its own copy of this class.
    let name = format!("VSTGUITaskRunner_{:x}", runTask as usize);
    let Some(mut decl) = ClassDecl::new(&name, class!(NSObject)) else {
        tracing::error!("Objective-C class {} is already defined", name);
        return None;
    };
    decl.add_ivar::<*mut c_void>(PENDING_IVAR);
    decl.add_method(sel!(runTask), runTask as extern "C" fn(&Object, Sel));
    decl.add_method(sel!(dealloc), dealloc as extern "C" fn(&Object, Sel));
    Some(RunnerClass(decl.register()))
});

extern "C" fn runTask(this: &Object, _: Sel) {
    unsafe {
        let pending: *mut c_void = *this.get_ivar(PENDING_IVAR);
        if !pending.is_null() {
            run_next(&*(pending as *const Pending));
        }
    }
}

extern "C" fn dealloc(this: &Object, _: Sel) {
    unsafe {
        let pending: *mut c_void = *this.get_ivar(PENDING_IVAR);
        if !pending.is_null() {
            drop(Arc::from_raw(pending as *const Pending));
        }
        let () = msg_send![super(this, class!(NSObject)), dealloc];
    }
}

/// The main queue on macOS.
struct MacMainQueue {
    pending: Arc<Pending>,
    /// An instance of `RUNNER_CLASS`, owned by us.
    runner: id,
}

// `performSelectorOnMainThread:` may be sent from any thread, and the runner
// only touches the FIFO through its mutex.
unsafe impl Send for MacMainQueue {}
unsafe impl Sync for MacMainQueue {}

impl MacMainQueue {
    fn new() -> Result<MacMainQueue, Error> {
        let class = match &*RUNNER_CLASS {
            Some(class) => class.0,
            None => return Err(Error::MainQueueUnavailable),
        };
        let pending: Arc<Pending> = Arc::new(Mutex::new(VecDeque::new()));
        unsafe {
            let runner: id = msg_send![class, new];
            if runner == nil {
                tracing::error!("failed to create the main-queue task runner");
                return Err(Error::MainQueueUnavailable);
            }
            let ivar = Arc::into_raw(Arc::clone(&pending)) as *mut c_void;
            (*runner).set_ivar(PENDING_IVAR, ivar);
            Ok(MacMainQueue { pending, runner })
        }
    }
}

impl MainThreadDispatch for MacMainQueue {
    fn dispatch(&self, task: Task) {
        lock!(self.pending).push_back(task);
        unsafe {
            // Worker threads have no autorelease pool of their own.
            let pool = NSAutoreleasePool::new(nil);
            let () = msg_send![self.runner, performSelectorOnMainThread: sel!(runTask)
                withObject: nil waitUntilDone: NO];
            pool.drain();
        }
    }

    fn pump(&self) {
        while run_next(&self.pending) {}
    }
}

impl Drop for MacMainQueue {
    fn drop(&mut self) {
        let discarded = mem::take(&mut *lock!(self.pending));
        if !discarded.is_empty() {
            tracing::warn!("discarded {} main-queue tasks at shutdown", discarded.len());
        }
        // Requests still queued on the run loop keep the runner alive and
        // find the FIFO empty.
        unsafe {
            let () = msg_send![self.runner, release];
        }
    }
}

/// The task executor used on macOS.
pub struct MacTaskExecutor(ThreadPoolTaskExecutor<MacMainQueue>);

impl MacTaskExecutor {
    /// Create the executor.
    ///
    /// Must be called on the main thread.
    pub fn new(config: &ExecutorConfig) -> Result<MacTaskExecutor, Error> {
        let main = MacMainQueue::new()?;
        Ok(MacTaskExecutor(ThreadPoolTaskExecutor::new(config, main)))
    }
}

forward_task_executor!(MacTaskExecutor);
