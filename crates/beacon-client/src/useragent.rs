//! Device, browser, and OS detection from the user-agent string.
//!
//! Substring heuristics, matching what tracking snippets actually do: the
//! result is a coarse label for breakdown charts, not a parser. Order
//! matters — Chrome ships "Safari" in its UA, Edge ships "Chrome".

use beacon_core::session::{DeviceInfo, DeviceType};

pub fn parse(user_agent: &str) -> DeviceInfo {
  DeviceInfo {
    device_type:      device_type(user_agent),
    browser:          browser(user_agent).to_owned(),
    operating_system: operating_system(user_agent).to_owned(),
  }
}

fn device_type(ua: &str) -> DeviceType {
  if ua.contains("iPad") || ua.contains("Tablet") {
    DeviceType::Tablet
  } else if ua.contains("Mobi") || ua.contains("iPhone")
    || (ua.contains("Android") && ua.contains("Mobile"))
  {
    DeviceType::Mobile
  } else {
    DeviceType::Desktop
  }
}

fn browser(ua: &str) -> &'static str {
  if ua.contains("Edg/") || ua.contains("Edge/") {
    "Edge"
  } else if ua.contains("OPR/") || ua.contains("Opera") {
    "Opera"
  } else if ua.contains("Firefox/") {
    "Firefox"
  } else if ua.contains("Chrome/") {
    "Chrome"
  } else if ua.contains("Safari/") {
    "Safari"
  } else if ua.contains("MSIE") || ua.contains("Trident/") {
    "Internet Explorer"
  } else {
    "Unknown"
  }
}

fn operating_system(ua: &str) -> &'static str {
  if ua.contains("iPhone") || ua.contains("iPad") {
    "iOS"
  } else if ua.contains("Android") {
    "Android"
  } else if ua.contains("Windows") {
    "Windows"
  } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
    "macOS"
  } else if ua.contains("Linux") {
    "Linux"
  } else {
    "Unknown"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const FIREFOX_LINUX: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
  const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
  const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 \
     Edg/126.0.0.0";
  const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like \
     Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 \
     Mobile/15E148 Safari/604.1";
  const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile \
     Safari/537.36";
  const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_5 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 \
     Safari/604.1";

  #[test]
  fn desktop_browsers() {
    let info = parse(FIREFOX_LINUX);
    assert_eq!(info.device_type, DeviceType::Desktop);
    assert_eq!(info.browser, "Firefox");
    assert_eq!(info.operating_system, "Linux");

    let info = parse(CHROME_WINDOWS);
    assert_eq!(info.browser, "Chrome");
    assert_eq!(info.operating_system, "Windows");

    // Edge carries "Chrome" in its UA; the more specific token wins.
    let info = parse(EDGE_WINDOWS);
    assert_eq!(info.browser, "Edge");
  }

  #[test]
  fn mobile_devices() {
    let info = parse(SAFARI_IPHONE);
    assert_eq!(info.device_type, DeviceType::Mobile);
    assert_eq!(info.browser, "Safari");
    assert_eq!(info.operating_system, "iOS");

    let info = parse(CHROME_ANDROID);
    assert_eq!(info.device_type, DeviceType::Mobile);
    assert_eq!(info.operating_system, "Android");
  }

  #[test]
  fn tablets() {
    let info = parse(SAFARI_IPAD);
    assert_eq!(info.device_type, DeviceType::Tablet);
    assert_eq!(info.operating_system, "iOS");
  }

  #[test]
  fn unknown_ua_degrades_gracefully() {
    let info = parse("curl/8.6.0");
    assert_eq!(info.device_type, DeviceType::Desktop);
    assert_eq!(info.browser, "Unknown");
    assert_eq!(info.operating_system, "Unknown");
  }
}
