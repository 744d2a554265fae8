//! Well-known event names used by the player hosts and built-in plugins.
//!
//! Buses accept any string as an event name; these enums only collect the
//! names the core itself triggers or listens for.

/// Public lifecycle and playback events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    DidDestroy,
    DidUpdateOptions,
    DidChangeActiveContainer,
    DidChangeActivePlayback,
    Ready,
    Playing,
    DidPause,
    DidStop,
    DidComplete,
    Error,
    DidEnterFullscreen,
    DidExitFullscreen,
    EnableMediaControl,
    DisableMediaControl,
    WillShowMediaControl,
    DidShowMediaControl,
    WillHideMediaControl,
    DidHideMediaControl,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DidDestroy => "didDestroy",
            Event::DidUpdateOptions => "didUpdateOptions",
            Event::DidChangeActiveContainer => "didChangeActiveContainer",
            Event::DidChangeActivePlayback => "didChangeActivePlayback",
            Event::Ready => "ready",
            Event::Playing => "playing",
            Event::DidPause => "didPause",
            Event::DidStop => "didStop",
            Event::DidComplete => "didComplete",
            Event::Error => "error",
            Event::DidEnterFullscreen => "didEnterFullscreen",
            Event::DidExitFullscreen => "didExitFullscreen",
            Event::EnableMediaControl => "enableMediaControl",
            Event::DisableMediaControl => "disableMediaControl",
            Event::WillShowMediaControl => "willShowMediaControl",
            Event::DidShowMediaControl => "didShowMediaControl",
            Event::WillHideMediaControl => "willHideMediaControl",
            Event::DidHideMediaControl => "didHideMediaControl",
        }
    }
}

/// Events exchanged between the core and its own plugins only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalEvent {
    DidTappedCore,
    WillBeginScrubbing,
    DidFinishScrubbing,
}

impl InternalEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            InternalEvent::DidTappedCore => "didTappedCore",
            InternalEvent::WillBeginScrubbing => "willBeginScrubbing",
            InternalEvent::DidFinishScrubbing => "didFinishScrubbing",
        }
    }
}

impl AsRef<str> for Event {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for InternalEvent {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for InternalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
