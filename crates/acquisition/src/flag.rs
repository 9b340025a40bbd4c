//! Link-up flag shared between the link event handler and the task

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Create the single writer and a reader of a link-up flag (initially down)
pub fn link_flag() -> (LinkFlagWriter, LinkFlag) {
    let flag = Arc::new(AtomicBool::new(false));
    (LinkFlagWriter(flag.clone()), LinkFlag(flag))
}

/// The only handle able to change the flag. Not `Clone`.
#[derive(Debug)]
pub struct LinkFlagWriter(Arc<AtomicBool>);

impl LinkFlagWriter {
    pub fn set_up(&self, up: bool) {
        self.0.store(up, Ordering::Release);
    }

    pub fn reader(&self) -> LinkFlag {
        LinkFlag(self.0.clone())
    }
}

/// Read side of the link-up flag
#[derive(Debug, Clone)]
pub struct LinkFlag(Arc<AtomicBool>);

impl LinkFlag {
    pub fn is_up(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_visible_to_readers() {
        let (writer, reader) = link_flag();
        let other = writer.reader();
        assert!(!reader.is_up());

        writer.set_up(true);
        assert!(reader.is_up());
        assert!(other.is_up());

        writer.set_up(false);
        assert!(!reader.is_up());
    }
}
