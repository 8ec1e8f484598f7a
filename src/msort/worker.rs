//! Forked process workers.
//!
//! Transfer strategy is stream relay: the child sorts private
//! copy-on-write pages and serializes its full result back through a
//! pipe. The parent reads exactly the declared byte count into the left
//! child's primary slice, then reaps the process. The join therefore
//! blocks until both the transfer and the child's termination complete.

use std::io;

use super::error::SortError;
use super::sched::{Ctx, WorkItem, sort_node};

/// A forked child sorting the left half of a node.
pub(crate) struct ForkWorker {
    pub(crate) pid: libc::pid_t,
    pub(crate) read_fd: libc::c_int,
    pub(crate) expected: usize,
}

impl ForkWorker {
    /// Fork a child to sort `item`'s subtree. Returns in the parent; the
    /// child never returns — it relays its sorted buffer and `_exit`s.
    pub(crate) fn spawn(item: &mut WorkItem<'_>, ctx: &Ctx<'_>) -> Result<Self, SortError> {
        let mut fds = [0 as libc::c_int; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
            return Err(SortError::WorkerLaunch {
                op: "pipe",
                source: io::Error::last_os_error(),
            });
        }
        let expected = item.data.len();

        match unsafe { libc::fork() } {
            -1 => {
                let err = io::Error::last_os_error();
                unsafe {
                    libc::close(fds[0]);
                    libc::close(fds[1]);
                }
                Err(SortError::WorkerLaunch {
                    op: "fork",
                    source: err,
                })
            }
            0 => {
                // Child. _exit skips atexit handlers and stdio flushing
                // inherited from the parent.
                unsafe { libc::close(fds[0]) };
                let status = match child_main(item, ctx, fds[1]) {
                    Ok(()) => 0,
                    Err(e) => {
                        eprintln!("fmsort worker: {}", e);
                        1
                    }
                };
                unsafe { libc::_exit(status) }
            }
            pid => {
                unsafe { libc::close(fds[1]) };
                Ok(ForkWorker {
                    pid,
                    read_fd: fds[0],
                    expected,
                })
            }
        }
    }

    /// Read the child's full result into `dst`, then reap it. A child
    /// that reported failure wins over the short transfer it caused.
    pub(crate) fn join(self, dst: &mut [u8]) -> Result<(), SortError> {
        debug_assert_eq!(dst.len(), self.expected);

        let got = read_full_fd(self.read_fd, dst);
        unsafe { libc::close(self.read_fd) };

        let status = reap(self.pid)?;
        if status != 0 {
            return Err(SortError::WorkerExit { status });
        }
        if got != self.expected {
            return Err(SortError::WorkerTransfer {
                expected: self.expected,
                got,
            });
        }
        Ok(())
    }
}

/// Child side: sort the subtree, then relay the sorted primary buffer.
fn child_main(item: &mut WorkItem<'_>, ctx: &Ctx<'_>, fd: libc::c_int) -> Result<(), SortError> {
    sort_node(item.reborrow(), ctx)?;
    write_full_fd(fd, item.data)
}

/// Read until `buf` is full, EOF, or an unrecoverable error; returns the
/// byte count. A read error mid-relay surfaces as a short transfer.
fn read_full_fd(fd: libc::c_int, buf: &mut [u8]) -> usize {
    let mut total = 0;
    while total < buf.len() {
        let n = unsafe {
            libc::read(
                fd,
                buf[total..].as_mut_ptr() as *mut libc::c_void,
                buf.len() - total,
            )
        };
        if n > 0 {
            total += n as usize;
        } else if n == 0 {
            break;
        } else {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            break;
        }
    }
    total
}

/// Write all of `buf` to `fd`; anything short is a transfer failure.
fn write_full_fd(fd: libc::c_int, buf: &[u8]) -> Result<(), SortError> {
    let mut total = 0;
    while total < buf.len() {
        let n = unsafe {
            libc::write(
                fd,
                buf[total..].as_ptr() as *const libc::c_void,
                buf.len() - total,
            )
        };
        if n > 0 {
            total += n as usize;
        } else if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(SortError::WorkerTransfer {
                expected: buf.len(),
                got: total,
            });
        } else {
            return Err(SortError::WorkerTransfer {
                expected: buf.len(),
                got: total,
            });
        }
    }
    Ok(())
}

/// Wait for `pid` and translate its wait status into an exit code;
/// termination by signal N maps to 128 + N.
fn reap(pid: libc::pid_t) -> Result<i32, SortError> {
    let mut status: libc::c_int = 0;
    loop {
        if unsafe { libc::waitpid(pid, &mut status, 0) } == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(SortError::WorkerLaunch {
                op: "waitpid",
                source: err,
            });
        }
        break;
    }

    if libc::WIFEXITED(status) {
        Ok(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        Ok(128 + libc::WTERMSIG(status))
    } else {
        Ok(-1)
    }
}
