use std::fs::File;
use std::io::BufRead;

use crate::error::TraceError;

/// Opens a trace file for sequential line by line reading
pub fn get_reader(file: File) -> Result<impl BufRead, TraceError> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::BufReader;
        // Traces are read strictly front to back, a large buffer keeps the number of reads down
        const BUFFER_SIZE: usize = 64 * 4096;
        Ok(BufReader::with_capacity(BUFFER_SIZE, file))
    }
    // Memory map the file on unix systems, traces run to hundreds of megabytes
    #[cfg(unix)]
    {
        use std::io::Cursor;
        use memmap2::{Advice, Mmap};
        // Safety: the mapping is read only, and the trace isn't expected to be modified while the
        // simulation runs
        unsafe {
            let m = Mmap::map(&file)?;
            m.advise(Advice::Sequential)?;
            Ok(Cursor::new(m))
        }
    }
}
