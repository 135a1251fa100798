// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! The Windows task executor.
//!
//! Main-queue tasks are posted as messages to a hidden message-only window.
//! The message carries a pointer to the boxed task, which the window
//! procedure takes back ownership of and runs.

use std::ffi::OsStr;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use winapi::shared::minwindef::{FALSE, HINSTANCE, LPARAM, LRESULT, UINT, WPARAM};
use winapi::shared::windef::HWND;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::winuser::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW, PostMessageW,
    RegisterClassW, HWND_MESSAGE, MSG, PM_REMOVE, WM_USER, WNDCLASSW,
};

use crate::backend::shared::{MainThreadDispatch, ThreadPoolTaskExecutor};
use crate::common_util::run_task;
use crate::error::Error;
use crate::tasks::{ExecutorConfig, Task};

/// Message carrying a `*mut Task` in its `LPARAM`.
const DS_RUN_TASK: UINT = WM_USER;

const CLASS_NAME: &str = "VSTGUI Task Window";

/// Used to ensure the window class is registered only once per process.
static WINDOW_CLASS_REGISTERED: AtomicBool = AtomicBool::new(false);

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(Some(0)).collect()
}

unsafe extern "system" fn task_window_proc(
    hwnd: HWND,
    msg: UINT,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == DS_RUN_TASK {
        let task = Box::from_raw(lparam as *mut Task);
        run_task(*task);
        return 0;
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// The main queue on Windows.
struct Win32MainQueue {
    hwnd: HWND,
}

// `PostMessageW` may be called from any thread. Everything else only runs on
// the thread that created the window.
unsafe impl Send for Win32MainQueue {}
unsafe impl Sync for Win32MainQueue {}

impl Win32MainQueue {
    fn new() -> Result<Win32MainQueue, Error> {
        let class_name = to_wide(CLASS_NAME);
        unsafe {
            let instance = GetModuleHandleW(ptr::null()) as HINSTANCE;
            if WINDOW_CLASS_REGISTERED
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let wnd = WNDCLASSW {
                    style: 0,
                    lpfnWndProc: Some(task_window_proc),
                    cbClsExtra: 0,
                    cbWndExtra: 0,
                    hInstance: instance,
                    hIcon: ptr::null_mut(),
                    hCursor: ptr::null_mut(),
                    hbrBackground: ptr::null_mut(),
                    lpszMenuName: ptr::null(),
                    lpszClassName: class_name.as_ptr(),
                };
                if RegisterClassW(&wnd) == 0 {
                    WINDOW_CLASS_REGISTERED.store(false, Ordering::Release);
                    tracing::error!("failed to register task window class: {}", GetLastError());
                    return Err(Error::MainQueueUnavailable);
                }
            }

            let hwnd = CreateWindowExW(
                0,
                class_name.as_ptr(),
                ptr::null(),
                0,
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                ptr::null_mut(),
                instance,
                ptr::null_mut(),
            );
            if hwnd.is_null() {
                tracing::error!("failed to create task window: {}", GetLastError());
                return Err(Error::MainQueueUnavailable);
            }
            Ok(Win32MainQueue { hwnd })
        }
    }
}

impl MainThreadDispatch for Win32MainQueue {
    fn dispatch(&self, task: Task) {
        let task = Box::into_raw(Box::new(task));
        unsafe {
            if PostMessageW(self.hwnd, DS_RUN_TASK, 0, task as LPARAM) == FALSE {
                tracing::error!("PostMessageW DS_RUN_TASK failed: {}", GetLastError());
                drop(Box::from_raw(task));
            }
        }
    }

    fn pump(&self) {
        unsafe {
            let mut msg = mem::MaybeUninit::<MSG>::uninit();
            while PeekMessageW(msg.as_mut_ptr(), self.hwnd, DS_RUN_TASK, DS_RUN_TASK, PM_REMOVE)
                != FALSE
            {
                DispatchMessageW(msg.as_ptr());
            }
        }
    }
}

impl Drop for Win32MainQueue {
    fn drop(&mut self) {
        unsafe {
            // Reclaim tasks that were posted but never dispatched.
            let mut msg = mem::MaybeUninit::<MSG>::uninit();
            let mut discarded = 0usize;
            while PeekMessageW(msg.as_mut_ptr(), self.hwnd, DS_RUN_TASK, DS_RUN_TASK, PM_REMOVE)
                != FALSE
            {
                drop(Box::from_raw(msg.assume_init_ref().lParam as *mut Task));
                discarded += 1;
            }
            if discarded > 0 {
                tracing::warn!("discarded {} main-queue tasks at shutdown", discarded);
            }
            if DestroyWindow(self.hwnd) == FALSE {
                tracing::warn!("failed to destroy task window: {}", GetLastError());
            }
        }
    }
}

/// The task executor used on Windows.
pub struct Win32TaskExecutor(ThreadPoolTaskExecutor<Win32MainQueue>);

impl Win32TaskExecutor {
    /// Create the executor.
    ///
    /// Must be called on the UI thread: its message loop runs main-queue tasks.
    pub fn new(config: &ExecutorConfig) -> Result<Win32TaskExecutor, Error> {
        let main = Win32MainQueue::new()?;
        Ok(Win32TaskExecutor(ThreadPoolTaskExecutor::new(config, main)))
    }
}

forward_task_executor!(Win32TaskExecutor);
