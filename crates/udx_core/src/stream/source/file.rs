use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use udx_error::{Result, UdxError};

use crate::stream::buffer::ByteBuffer;
use crate::stream::{Source, StreamState};

/// Reads a whole local file.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    handle: Option<File>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource {
            path: path.into(),
            handle: None,
        }
    }
}

impl Source for FileSource {
    fn setup(&mut self) -> Result<()> {
        self.handle = Some(open_file(&self.path)?);
        debug!(path = %self.path.display(), "opened file source");
        Ok(())
    }

    fn process(&mut self, output: &mut ByteBuffer) -> Result<StreamState> {
        let handle = opened(&mut self.handle, &self.path)?;
        let (_, eof) = fill_output(handle, output, u64::MAX, &self.path)?;
        Ok(if eof {
            StreamState::Done
        } else {
            StreamState::NeedsOutputSpace
        })
    }

    fn destroy(&mut self) -> Result<()> {
        if self.handle.take().is_some() {
            debug!(path = %self.path.display(), "closed file source");
        }
        Ok(())
    }
}

pub(crate) fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        UdxError::resource("Error opening file")
            .with_field("path", path.display())
            .with_source(e)
    })
}

pub(crate) fn opened<'a, T>(handle: &'a mut Option<T>, path: &Path) -> Result<&'a mut T> {
    handle.as_mut().ok_or_else(|| {
        UdxError::contract("Source processed before setup").with_field("path", path.display())
    })
}

/// Read from `reader` into the free space of `output`, at most `limit`
/// bytes.
///
/// Returns the number of bytes read and whether the reader hit end of file.
/// Stops early without hitting EOF only when the output is full or the limit
/// is reached.
pub(crate) fn fill_output(
    reader: &mut impl Read,
    output: &mut ByteBuffer,
    limit: u64,
    path: &Path,
) -> Result<(usize, bool)> {
    if output.capacity() == 0 {
        return Err(UdxError::capacity("Source got a zero sized output buffer"));
    }

    let mut total = 0;
    loop {
        let room = (output.spare_capacity() as u64).min(limit - total as u64) as usize;
        if room == 0 {
            return Ok((total, false));
        }

        match reader.read(&mut output.spare_mut()[..room]) {
            Ok(0) => return Ok((total, true)),
            Ok(n) => {
                output.commit(n)?;
                total += n;
            }
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(UdxError::resource("Error reading file")
                    .with_field("path", path.display())
                    .with_source(e));
            }
        }
    }
}
