//! Web Audio amplitude source: `MediaStream → MediaStreamAudioSourceNode →
//! AnalyserNode`, read once per frame with `getByteFrequencyData`.
//!
//! The page owns `getUserMedia` (it is promise-based and needs a user
//! gesture); Rust receives the granted stream and builds the graph.

use candle_engine::{AmplitudeSource, AmplitudeStream, Error, Result};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{AnalyserNode, AudioContext, MediaStream, MediaStreamAudioSourceNode, MediaStreamTrack};

/// A granted microphone stream waiting to be wired into an analyser.
pub struct Microphone {
    stream: Option<MediaStream>,
    fft_size: u32,
}

impl Microphone {
    pub fn new(stream: MediaStream, fft_size: u32) -> Self {
        Self {
            stream: Some(stream),
            fft_size,
        }
    }
}

impl AmplitudeSource for Microphone {
    type Stream = AnalyserStream;

    fn start_capture(&mut self) -> Result<AnalyserStream> {
        let stream = self.stream.take().ok_or(Error::PermissionDenied)?;
        AnalyserStream::connect(stream, self.fft_size)
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stop_tracks(&stream);
            log::info!("unused microphone stream stopped");
        }
    }
}

/// The live audio graph. Everything is torn down in `stop`.
pub struct AnalyserStream {
    context: AudioContext,
    source: MediaStreamAudioSourceNode,
    analyser: AnalyserNode,
    stream: MediaStream,
}

impl AnalyserStream {
    fn connect(stream: MediaStream, fft_size: u32) -> Result<Self> {
        match Self::build_graph(&stream, fft_size) {
            Ok((context, source, analyser)) => Ok(Self {
                context,
                source,
                analyser,
                stream,
            }),
            Err(e) => {
                stop_tracks(&stream);
                Err(e)
            }
        }
    }

    fn build_graph(
        stream: &MediaStream,
        fft_size: u32,
    ) -> Result<(AudioContext, MediaStreamAudioSourceNode, AnalyserNode)> {
        let context = AudioContext::new().map_err(js_error)?;
        let source = context.create_media_stream_source(stream).map_err(js_error)?;
        let analyser = context.create_analyser().map_err(js_error)?;
        analyser.set_fft_size(fft_size);
        source.connect_with_audio_node(&analyser).map_err(js_error)?;
        log::info!(
            "analyser connected: fft {} / {} bins",
            fft_size,
            analyser.frequency_bin_count()
        );
        Ok((context, source, analyser))
    }
}

impl AmplitudeStream for AnalyserStream {
    fn read_frame(&mut self, buf: &mut Vec<u8>) {
        buf.resize(self.analyser.frequency_bin_count() as usize, 0);
        self.analyser.get_byte_frequency_data(buf);
    }

    fn stop(&mut self) {
        if let Err(e) = self.source.disconnect() {
            log::warn!("analyser disconnect failed: {:?}", e);
        }
        if let Err(e) = self.context.close() {
            log::warn!("audio context close failed: {:?}", e);
        }
        stop_tracks(&self.stream);
    }
}

fn stop_tracks(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
}

fn js_error(value: JsValue) -> Error {
    Error::AudioGraph(format!("{:?}", value))
}
