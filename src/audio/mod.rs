//! Reaction clips (taunt / praise) on a dedicated playback thread.
//!
//! rodio's output stream is not `Send`, so it lives and dies on the audio
//! thread; everyone else talks to it through a command channel.

use log::{debug, warn};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

enum AudioCommand {
    Play(PathBuf),
    Stop,
}

#[derive(Clone)]
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    enabled: bool,
}

impl AudioEngineHandle {
    pub fn new(enabled: bool) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play(path) => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                warn!("{err}");
                                continue;
                            }
                            let Some(ref s) = sink else { continue };
                            // One reaction at a time; a punch during playback stays silent.
                            if !s.empty() {
                                debug!("Clip already playing, skipping {}", path.display());
                                continue;
                            }
                            match open_clip(&path) {
                                Ok(source) => s.append(source),
                                Err(err) => warn!("{err}"),
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    pub fn play(&self, clip: &Path) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::Play(clip.to_path_buf()))
            .map_err(|e| e.to_string())
    }

    pub fn stop(&self) -> Result<(), String> {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
        Ok(())
    }
}

fn open_clip(path: &Path) -> Result<Decoder<BufReader<File>>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open clip {}: {}", path.display(), e))?;
    Decoder::new(BufReader::new(file))
        .map_err(|e| format!("Failed to decode clip {}: {}", path.display(), e))
}
