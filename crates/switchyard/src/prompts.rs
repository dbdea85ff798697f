//! System prompts of the built-in specialists.

const MULTIMODAL: &str = include_str!("./prompts/multimodal.md");
const CODING: &str = include_str!("./prompts/coding.md");

pub(crate) fn multimodal() -> &'static str {
    MULTIMODAL
}

pub(crate) fn coding() -> String {
    CODING.replace("{{HOST_OS}}", host_os())
}

#[inline]
fn host_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        _ => "some other OS",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_os_is_filled_in() {
        let prompt = coding();
        assert!(!prompt.contains("{{HOST_OS}}"));
        assert!(prompt.contains(host_os()));
    }
}
