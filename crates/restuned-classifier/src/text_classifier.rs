/// Workload class a newly-exec'd process is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    App,
    Browser,
    Game,
    Media,
    Ignore,
}

/// Seam for whatever inference backend classifies the cleaned feature text.
/// The concrete fastText-family model is out of scope; this crate only
/// defines the contract and a deterministic fallback. Inference failures
/// are the caller's responsibility to treat as [`Classification::App`].
pub trait TextClassifier: Send + Sync {
    fn classify(&self, feature_text: &str) -> Classification;
}

/// Always classifies as `app`, matching the source's unconditional
/// fallback classifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultClassifier;

impl TextClassifier for DefaultClassifier {
    fn classify(&self, _feature_text: &str) -> Classification {
        Classification::App
    }
}

const GAME_VOCAB: &[&str] = &["steam", "proton", "lutris", "wine", "unity", "unreal", "vulkan"];
const MEDIA_VOCAB: &[&str] = &["vlc", "mpv", "spotify", "ffmpeg", "gstreamer", "pulseaudio", "pipewire"];
const BROWSER_VOCAB: &[&str] = &[
    "firefox", "chrome", "chromium", "webkit", "gecko", "safari", "opera", "brave", "vivaldi", "edge", "lynx", "w3m",
    "falkon", "httrack", "konqueror", "amfora", "luakit", "epiphany",
];

/// Deterministic keyword-vote stand-in for a fastText-family model: counts
/// vocabulary hits per class over whitespace-delimited feature tokens and
/// takes the top-1, unknown maps to `app`, without depending on a trained
/// model artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl TextClassifier for KeywordClassifier {
    fn classify(&self, feature_text: &str) -> Classification {
        let mut browser = 0usize;
        let mut game = 0usize;
        let mut media = 0usize;

        for token in feature_text.split_whitespace() {
            if BROWSER_VOCAB.contains(&token) {
                browser += 1;
            } else if GAME_VOCAB.contains(&token) {
                game += 1;
            } else if MEDIA_VOCAB.contains(&token) {
                media += 1;
            }
        }

        match [browser, game, media].iter().enumerate().max_by_key(|(_, count)| **count) {
            Some((_, 0)) => Classification::App,
            Some((0, _)) => Classification::Browser,
            Some((1, _)) => Classification::Game,
            Some((2, _)) => Classification::Media,
            _ => Classification::App,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classifier_always_returns_app() {
        assert_eq!(DefaultClassifier.classify("firefox gecko"), Classification::App);
    }

    #[test]
    fn keyword_classifier_picks_strongest_vocabulary() {
        assert_eq!(KeywordClassifier.classify("firefox gecko webkit"), Classification::Browser);
        assert_eq!(KeywordClassifier.classify("steam proton"), Classification::Game);
        assert_eq!(KeywordClassifier.classify("vlc mpv ffmpeg"), Classification::Media);
        assert_eq!(KeywordClassifier.classify("bash ls grep"), Classification::App);
    }
}
