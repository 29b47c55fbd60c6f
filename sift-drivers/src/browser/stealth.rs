use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Levels of stealth applied to the browser session.
pub enum StealthProfile {
    Lightweight,
    Balanced,
    Maximum,
}

impl FromStr for StealthProfile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lightweight" | "light" => Ok(Self::Lightweight),
            "balanced" => Ok(Self::Balanced),
            "maximum" | "max" => Ok(Self::Maximum),
            other => Err(format!("unknown stealth profile '{other}'")),
        }
    }
}

/// Construct Chrome command-line arguments for a given stealth profile.
pub fn build_stealth_arguments(
    profile: &StealthProfile,
    user_agent: Option<&str>,
    (width, height): (u32, u32),
) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        format!("--window-size={width},{height}"),
    ];
    if let Some(ua) = user_agent {
        args.push(format!("--user-agent={ua}"));
    }
    if let StealthProfile::Maximum = profile {
        args.push("--disable-plugins-discovery".to_string());
    }
    args
}

/// JavaScript evasions applied after each navigation to reduce automation signals.
pub struct StealthScripts;

impl StealthScripts {
    pub fn for_profile(profile: &StealthProfile) -> Vec<&'static str> {
        match profile {
            StealthProfile::Lightweight => vec![Self::core_evasions()],
            StealthProfile::Balanced => vec![Self::core_evasions(), Self::canvas_evasions()],
            StealthProfile::Maximum => vec![
                Self::core_evasions(),
                Self::canvas_evasions(),
                Self::webgl_evasions(),
            ],
        }
    }

    pub fn core_evasions() -> &'static str {
        r#"
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
            Object.defineProperty(navigator, 'plugins', { get: () => [1,2,3] });
            if (!window.chrome) window.chrome = { runtime: {} };
        "#
    }

    pub fn webgl_evasions() -> &'static str {
        r#"
            const getParameter = WebGLRenderingContext.prototype.getParameter;
            WebGLRenderingContext.prototype.getParameter = function(parameter) {
                if (parameter === 37445) return 'Intel Inc.';
                if (parameter === 37446) return 'Intel Iris OpenGL Engine';
                return getParameter.call(this, parameter);
            };
        "#
    }

    pub fn canvas_evasions() -> &'static str {
        r#"
            const getContext = HTMLCanvasElement.prototype.getContext;
            HTMLCanvasElement.prototype.getContext = function(type, ...args) {
                const ctx = getContext.call(this, type, ...args);
                if (type === '2d' && ctx) {
                    const toDataURL = this.toDataURL;
                    this.toDataURL = function(...a) {
                        const img = ctx.getImageData(0, 0, this.width, this.height);
                        for (let i = 0; i < img.data.length; i += 4) {
                            if (Math.random() < 0.001) img.data[i] += Math.random() < 0.5 ? -1 : 1;
                        }
                        ctx.putImageData(img, 0, 0);
                        return toDataURL.call(this, ...a);
                    };
                }
                return ctx;
            };
        "#
    }
}
