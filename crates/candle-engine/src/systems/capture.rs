//! Amplitude capture seam. The engine never touches a microphone itself:
//! the host provides an `AmplitudeSource`, and the session holds the running
//! stream inside a `Capture` that releases it on drop.

use crate::error::Result;

/// Something that can be asked to start producing magnitude frames.
pub trait AmplitudeSource {
    type Stream: AmplitudeStream + 'static;

    /// Open the underlying capture. Fails with `Error::PermissionDenied`
    /// when the user refused access.
    fn start_capture(&mut self) -> Result<Self::Stream>;

    /// Give back a source that will never be started.
    fn release(&mut self) {}
}

/// A running capture.
pub trait AmplitudeStream {
    /// Overwrite `buf` with the current frame of magnitudes (0–255).
    fn read_frame(&mut self, buf: &mut Vec<u8>);

    /// Release the underlying resources. Called exactly once, by `Capture`.
    fn stop(&mut self);
}

/// Owns a running stream and stops it when dropped.
pub struct Capture {
    stream: Box<dyn AmplitudeStream>,
    frame: Vec<u8>,
}

impl Capture {
    /// Start `source` and take ownership of the resulting stream.
    pub fn acquire<S: AmplitudeSource>(source: &mut S) -> Result<Self> {
        let stream = source.start_capture()?;
        Ok(Self {
            stream: Box::new(stream),
            frame: Vec::with_capacity(128),
        })
    }

    /// Pull the current frame. The slice is valid until the next read.
    pub fn read_frame(&mut self) -> &[u8] {
        self.stream.read_frame(&mut self.frame);
        &self.frame
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.stream.stop();
        log::info!("amplitude capture released");
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted sources shared by the session tests.

    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared view into a fake stream: the level it reports and whether it was stopped.
    #[derive(Clone, Default)]
    pub struct Probe {
        pub level: Rc<RefCell<u8>>,
        pub stopped: Rc<RefCell<u32>>,
        pub reads: Rc<RefCell<u32>>,
        pub released: Rc<RefCell<u32>>,
    }

    pub struct FakeStream {
        probe: Probe,
    }

    impl AmplitudeStream for FakeStream {
        fn read_frame(&mut self, buf: &mut Vec<u8>) {
            *self.probe.reads.borrow_mut() += 1;
            buf.clear();
            buf.resize(128, *self.probe.level.borrow());
        }

        fn stop(&mut self) {
            *self.probe.stopped.borrow_mut() += 1;
        }
    }

    pub struct FakeMicrophone {
        pub probe: Probe,
        pub granted: bool,
    }

    impl FakeMicrophone {
        pub fn granted() -> Self {
            Self { probe: Probe::default(), granted: true }
        }

        pub fn denied() -> Self {
            Self { probe: Probe::default(), granted: false }
        }
    }

    impl AmplitudeSource for FakeMicrophone {
        type Stream = FakeStream;

        fn start_capture(&mut self) -> Result<FakeStream> {
            if self.granted {
                Ok(FakeStream { probe: self.probe.clone() })
            } else {
                Err(Error::PermissionDenied)
            }
        }

        fn release(&mut self) {
            *self.probe.released.borrow_mut() += 1;
        }
    }
}
