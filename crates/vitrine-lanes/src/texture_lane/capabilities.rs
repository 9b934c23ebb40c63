// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::Serialize;

/// Browser family recognised from a user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    /// Chromium-based Chrome.
    Chrome,
    /// Firefox.
    Firefox,
    /// Safari.
    Safari,
    /// Chromium-based Edge.
    Edge,
    /// Anything else.
    Unknown,
}

/// What a client can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    /// The client can sample GPU-compressed texture formats.
    pub supports_compressed_format: bool,
    /// The client can run the Basis Universal transcoder.
    pub supports_basis_transcode: bool,
    /// Detected browser family.
    pub browser: BrowserFamily,
    /// Whether the user agent describes a phone or tablet.
    pub mobile: bool,
}

/// Major version following `marker` in the user agent, e.g. `Version/15.4`.
fn major_after(user_agent: &str, marker: &str) -> Option<u32> {
    let start = user_agent.find(marker)? + marker.len();
    user_agent[start..]
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()
}

/// Classifies a client from its user agent. Pure: no I/O, no state.
///
/// Edge and the iOS builds of Chrome and Firefox carry other browsers'
/// tokens too, so the more specific tokens are checked first. Safari before
/// 15 lacks the WebAssembly features the Basis transcoder relies on.
pub fn detect_device_capabilities(user_agent: &str) -> DeviceCapabilities {
    let browser = if user_agent.contains("Edg/") || user_agent.contains("Edge/") {
        BrowserFamily::Edge
    } else if user_agent.contains("Firefox/") || user_agent.contains("FxiOS/") {
        BrowserFamily::Firefox
    } else if user_agent.contains("Chrome/") || user_agent.contains("CriOS/") {
        BrowserFamily::Chrome
    } else if user_agent.contains("Safari/") && user_agent.contains("Version/") {
        BrowserFamily::Safari
    } else {
        BrowserFamily::Unknown
    };

    let mobile = ["Mobi", "Android", "iPhone", "iPad"]
        .iter()
        .any(|token| user_agent.contains(token));

    let supports_basis_transcode = match browser {
        BrowserFamily::Unknown => false,
        BrowserFamily::Safari => major_after(user_agent, "Version/").is_some_and(|v| v >= 15),
        _ => true,
    };

    DeviceCapabilities {
        supports_compressed_format: browser != BrowserFamily::Unknown,
        supports_basis_transcode,
        browser,
        mobile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
    const EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.51";
    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
    const OLD_SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.1.2 Safari/605.1.15";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36";

    #[test]
    fn common_user_agents_are_classified() {
        assert_eq!(detect_device_capabilities(CHROME_DESKTOP).browser, BrowserFamily::Chrome);
        assert_eq!(detect_device_capabilities(EDGE).browser, BrowserFamily::Edge);
        assert_eq!(detect_device_capabilities(FIREFOX).browser, BrowserFamily::Firefox);
        assert_eq!(detect_device_capabilities(SAFARI_IPHONE).browser, BrowserFamily::Safari);
    }

    #[test]
    fn mobile_flag_follows_the_platform() {
        assert!(detect_device_capabilities(SAFARI_IPHONE).mobile);
        assert!(detect_device_capabilities(CHROME_ANDROID).mobile);
        assert!(!detect_device_capabilities(CHROME_DESKTOP).mobile);
    }

    #[test]
    fn old_safari_cannot_transcode_basis() {
        let caps = detect_device_capabilities(OLD_SAFARI);
        assert!(caps.supports_compressed_format);
        assert!(!caps.supports_basis_transcode);
        assert!(detect_device_capabilities(SAFARI_IPHONE).supports_basis_transcode);
    }

    #[test]
    fn unknown_clients_get_nothing() {
        let caps = detect_device_capabilities("curl/8.5.0");
        assert_eq!(caps.browser, BrowserFamily::Unknown);
        assert!(!caps.supports_compressed_format);
        assert!(!caps.supports_basis_transcode);
    }
}
