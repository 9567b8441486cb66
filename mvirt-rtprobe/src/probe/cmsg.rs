//! Ancillary data builder for `sendmsg`.
//!
//! Records are laid out the way the kernel walks them with `CMSG_NXTHDR`:
//! a `cmsghdr`, the payload at `CMSG_DATA`, then padding up to
//! `CMSG_SPACE(payload)` before the next header.

use std::mem;
use std::ptr;
use thiserror::Error;

/// Bytes a record with `data_len` payload bytes occupies, trailing padding included.
pub fn record_space(data_len: usize) -> usize {
    unsafe { libc::CMSG_SPACE(data_len as libc::c_uint) as usize }
}

/// Value of `cmsg_len` for a record with `data_len` payload bytes.
fn record_len(data_len: usize) -> usize {
    unsafe { libc::CMSG_LEN(data_len as libc::c_uint) as usize }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("control buffer full: record needs {needed} bytes, {available} left")]
pub struct ControlBufferFull {
    pub needed: usize,
    pub available: usize,
}

/// Fixed-capacity control buffer, sized once from the records it will hold.
#[derive(Debug, Clone)]
pub struct ControlBuffer {
    buf: Vec<u8>,
    len: usize,
}

impl ControlBuffer {
    /// Allocate exactly enough room for one record per payload size in `data_lens`.
    pub fn for_records(data_lens: &[usize]) -> Self {
        let capacity = data_lens.iter().map(|&n| record_space(n)).sum();
        Self {
            buf: vec![0; capacity],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop all records and zero the padding so nothing stale reaches the kernel.
    pub fn clear(&mut self) {
        self.buf.fill(0);
        self.len = 0;
    }

    /// Append one record carrying `value` as its payload.
    pub fn push<T: Copy>(
        &mut self,
        level: libc::c_int,
        kind: libc::c_int,
        value: &T,
    ) -> Result<(), ControlBufferFull> {
        let data_len = mem::size_of::<T>();
        let space = record_space(data_len);
        let available = self.buf.len() - self.len;
        if space > available {
            return Err(ControlBufferFull {
                needed: space,
                available,
            });
        }

        // cmsghdr differs between libcs (musl pads cmsg_len), so start zeroed.
        let mut hdr: libc::cmsghdr = unsafe { mem::zeroed() };
        hdr.cmsg_len = record_len(data_len) as _;
        hdr.cmsg_level = level;
        hdr.cmsg_type = kind;

        let record = &mut self.buf[self.len..self.len + space];
        // SAFETY: `record` holds CMSG_SPACE(data_len) bytes, which covers the
        // header plus the payload at CMSG_DATA. The kernel copies the control
        // block before parsing it, so unaligned writes are fine.
        unsafe {
            let base = record.as_mut_ptr();
            ptr::write_unaligned(base as *mut libc::cmsghdr, hdr);
            ptr::write_unaligned(base.add(record_len(0)) as *mut T, *value);
        }

        self.len += space;
        Ok(())
    }

    /// Bytes to hand to `msg_control`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Walk the records currently in the buffer.
    pub fn records(&self) -> Records<'_> {
        Records {
            bytes: self.as_bytes(),
        }
    }
}

/// A decoded control record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub level: libc::c_int,
    pub kind: libc::c_int,
    pub data: &'a [u8],
}

pub struct Records<'a> {
    bytes: &'a [u8],
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let header_len = record_len(0);
        if self.bytes.len() < header_len {
            return None;
        }

        // SAFETY: at least one aligned header's worth of bytes is present.
        let hdr: libc::cmsghdr =
            unsafe { ptr::read_unaligned(self.bytes.as_ptr() as *const libc::cmsghdr) };
        let total = hdr.cmsg_len as usize;
        if total < header_len || total > self.bytes.len() {
            return None;
        }

        let record = Record {
            level: hdr.cmsg_level,
            kind: hdr.cmsg_type,
            data: &self.bytes[header_len..total],
        };

        let step = record_space(total - header_len).min(self.bytes.len());
        self.bytes = &self.bytes[step..];
        Some(record)
    }
}
