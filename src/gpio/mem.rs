// Copyright (c) 2017-2019 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr;

use libc::{self, c_void, off_t, size_t, MAP_FAILED, MAP_SHARED, O_SYNC, PROT_READ, PROT_WRITE};
use log::debug;

use crate::gpio::{Error, Result};

// Each register contains 32 bits
pub(crate) const REG_SIZE: usize = std::mem::size_of::<u32>();

/// A block of 32-bit registers, addressed by word offset.
///
/// Writes take `&mut self`. Read-modify-write sequences on a shared word are
/// not atomic, so exclusive access is what keeps them consistent.
pub(crate) trait RegisterBlock: fmt::Debug + Send {
    /// Returns the size of the block in 32-bit words.
    fn words(&self) -> usize;
    fn read(&self, offset: usize) -> u32;
    fn write(&mut self, offset: usize, value: u32);
}

/// Opens the physical memory device with read/write/sync flags.
pub(crate) fn open_dev_mem(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(O_SYNC)
        .open(path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                Error::PermissionDenied(path.display().to_string())
            } else {
                e.into()
            }
        })
}

/// Converts a failed `mmap` of the window at `base` into a setup error.
/// Running out of memory is reported separately from other mapping failures.
pub(crate) fn map_error(base: u64, err: io::Error) -> Error {
    if err.raw_os_error() == Some(libc::ENOMEM) {
        Error::Allocation(err)
    } else {
        Error::Map(base, err)
    }
}

/// A memory-mapped window into physical memory, unmapped on drop.
pub(crate) struct MappedRegion {
    base: u64,
    mem_ptr: *mut u32,
    size: usize,
}

impl fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegion")
            .field("base", &format_args!("{:#010x}", self.base))
            .field("mem_ptr", &self.mem_ptr)
            .field("size", &self.size)
            .finish()
    }
}

impl MappedRegion {
    /// Maps `size` bytes of `mem_file`, starting at the page-aligned physical
    /// address `base`.
    pub(crate) fn map(mem_file: &File, base: u64, size: usize) -> Result<MappedRegion> {
        let mem_ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                mem_file.as_raw_fd(),
                base as off_t,
            )
        };

        if mem_ptr == MAP_FAILED {
            return Err(map_error(base, io::Error::last_os_error()));
        }

        debug!("Mapped {:#010x} ({} bytes) at {:p}", base, size, mem_ptr);

        Ok(MappedRegion {
            base,
            mem_ptr: mem_ptr as *mut u32,
            size,
        })
    }

    pub(crate) fn base(&self) -> u64 {
        self.base
    }
}

impl RegisterBlock for MappedRegion {
    fn words(&self) -> usize {
        self.size / REG_SIZE
    }

    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        debug_assert!(offset < self.words());

        unsafe { ptr::read_volatile(self.mem_ptr.add(offset)) }
    }

    #[inline(always)]
    fn write(&mut self, offset: usize, value: u32) {
        debug_assert!(offset < self.words());

        unsafe {
            ptr::write_volatile(self.mem_ptr.add(offset), value);
        }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.mem_ptr as *mut c_void, self.size as size_t);
        }
    }
}

// Required because of the raw pointer to our memory-mapped file
unsafe impl Send for MappedRegion {}

/// Heap-backed register block standing in for `/dev/mem` in tests.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct MemoryBlock {
    words: Vec<u32>,
}

#[cfg(test)]
impl MemoryBlock {
    pub(crate) fn new(size: usize) -> MemoryBlock {
        MemoryBlock {
            words: vec![0; size / REG_SIZE],
        }
    }
}

#[cfg(test)]
impl RegisterBlock for MemoryBlock {
    fn words(&self) -> usize {
        self.words.len()
    }

    fn read(&self, offset: usize) -> u32 {
        self.words[offset]
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.words[offset] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::system::tests::Fixture;

    #[test]
    fn missing_device() {
        let fixture = Fixture::new();
        let config = fixture.config();

        match open_dev_mem(config.dev_mem()) {
            Err(Error::DeviceOpen(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn mmap_errors() {
        match map_error(0x1000_5000, io::Error::from_raw_os_error(libc::ENOMEM)) {
            Error::Allocation(e) => assert_eq!(e.raw_os_error(), Some(libc::ENOMEM)),
            other => panic!("unexpected error: {:?}", other),
        }

        match map_error(0x1000_5000, io::Error::from_raw_os_error(libc::ENODEV)) {
            Error::Map(base, e) => {
                assert_eq!(base, 0x1000_5000);
                assert_eq!(e.raw_os_error(), Some(libc::ENODEV));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unmappable_device() {
        let file = open_dev_mem(Path::new("/dev/null")).unwrap();

        assert!(matches!(
            MappedRegion::map(&file, 0x01c2_0000, 4096),
            Err(Error::Map(0x01c2_0000, _))
        ));
    }

    #[test]
    fn memory_block() {
        let mut block = MemoryBlock::new(4096);

        assert_eq!(block.words(), 1024);
        block.write(0x200, 0xdead_beef);
        assert_eq!(block.read(0x200), 0xdead_beef);
        assert_eq!(block.read(0x201), 0);
    }
}
