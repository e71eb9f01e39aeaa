use log;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::PathBuf,
};

use crate::constants;
use crate::error::LogError;
use crate::model::LogRecord;

pub trait LogStore: Send {
    type Handle: Write;

    fn is_mounted(&self) -> bool;
    fn mount(&mut self) -> io::Result<()>;
    fn open_append(&mut self, name: &str) -> io::Result<(Self::Handle, u64)>;
}

// mounting recreates the directory
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LogStore for DirStore {
    type Handle = File;

    fn is_mounted(&self) -> bool {
        self.root.is_dir()
    }

    fn mount(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    fn open_append(&mut self, name: &str) -> io::Result<(File, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(name))?;
        let len = file.metadata()?.len();
        Ok((file, len))
    }
}

// No handle is kept between calls, a batch that cannot be written is dropped.
pub struct LogWriter<S: LogStore> {
    store: S,
    file_name: String,
}

impl<S: LogStore> LogWriter<S> {
    pub fn new(store: S, file_name: impl Into<String>) -> Self {
        Self {
            store,
            file_name: file_name.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn prepare(&mut self) -> Result<usize, LogError> {
        self.append(&[])
    }

    pub fn append(&mut self, records: &[LogRecord]) -> Result<usize, LogError> {
        let mut remounted = false;
        if !self.store.is_mounted() {
            log::warn!("Store not mounted, remounting");
            self.store.mount().map_err(LogError::Unavailable)?;
            remounted = true;
        }
        let (mut handle, len) = match self.store.open_append(&self.file_name) {
            Ok(opened) => opened,
            Err(e) if !remounted => {
                log::warn!("Failed to open {}: {}, remounting", self.file_name, e);
                self.store.mount().map_err(LogError::Unavailable)?;
                self.store
                    .open_append(&self.file_name)
                    .map_err(LogError::Unavailable)?
            }
            Err(e) => return Err(LogError::Unavailable(e)),
        };

        let mut text = String::new();
        if len == 0 {
            text.push_str(constants::CSV_HEADER);
            text.push('\n');
        }
        for record in records {
            text.push_str(&record.to_string());
            text.push('\n');
        }
        handle.write_all(text.as_bytes()).map_err(LogError::Write)?;
        handle.flush().map_err(LogError::Write)?;
        log::debug!("Wrote {} bytes to {}", text.len(), self.file_name);
        Ok(text.len())
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct Card {
        pub data: Arc<Mutex<Vec<u8>>>,
    }

    pub struct CardHandle(Arc<Mutex<Vec<u8>>>);

    impl Write for CardHandle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub struct FlakyStore {
        pub card: Card,
        pub mounted: bool,
        pub mount_fails: bool,
        pub open_failures: usize,
        pub mounts: usize,
        pub opens: usize,
    }

    impl FlakyStore {
        pub fn new(card: Card) -> Self {
            Self {
                card,
                mounted: true,
                mount_fails: false,
                open_failures: 0,
                mounts: 0,
                opens: 0,
            }
        }
    }

    impl LogStore for FlakyStore {
        type Handle = CardHandle;

        fn is_mounted(&self) -> bool {
            self.mounted
        }

        fn mount(&mut self) -> io::Result<()> {
            self.mounts += 1;
            if self.mount_fails {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no card"));
            }
            self.mounted = true;
            Ok(())
        }

        fn open_append(&mut self, _name: &str) -> io::Result<(CardHandle, u64)> {
            self.opens += 1;
            if self.open_failures > 0 {
                self.open_failures -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "card busy"));
            }
            let len = self.card.data.lock().unwrap().len() as u64;
            Ok((CardHandle(self.card.data.clone()), len))
        }
    }

    impl Card {
        pub fn contents(&self) -> String {
            String::from_utf8(self.data.lock().unwrap().clone()).unwrap()
        }
    }
}
