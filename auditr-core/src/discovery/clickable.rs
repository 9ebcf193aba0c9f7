//! Heuristic detection of elements worth clicking during SPA exploration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::browser::{BrowserError, BrowserPage};

/// Smallest clickable width considered, in CSS pixels.
pub const MIN_WIDTH: f64 = 60.0;
/// Smallest clickable height considered.
pub const MIN_HEIGHT: f64 = 30.0;
/// Candidates whose centers are closer than this on both axes are one region.
pub const PROXIMITY_PX: f64 = 30.0;
const MAX_TEXT_CHARS: usize = 80;

/// Raw element geometry as measured in the page, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickCandidate {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
    /// Trimmed text content.
    #[serde(default)]
    pub text: String,
    /// Lowercase tag name.
    pub tag: String,
}

impl ClickCandidate {
    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn area(&self) -> f64 {
        self.width * self.height
    }

    fn contains(&self, other: &ClickCandidate) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }
}

/// Visible area of the page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
}

/// A region to click, addressed by its geometric center.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickTarget {
    /// Horizontal center.
    pub x: f64,
    /// Vertical center, in document coordinates.
    pub y: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
    /// Trimmed text content.
    pub text: String,
    /// Lowercase tag name.
    pub tag: String,
}

impl ClickTarget {
    /// Box area in square CSS pixels.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Lists the click targets of the current page, most promising first.
#[async_trait]
pub trait ClickableFinder: Send + Sync {
    /// Click targets on the current page, most promising first.
    async fn find(&self, page: &dyn BrowserPage) -> Result<Vec<ClickTarget>, BrowserError>;
}

/// Measures pointer-styled and interactive elements in the live DOM, then
/// applies [`select_click_targets`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DomClickableFinder;

#[derive(Debug, Deserialize)]
struct Measurement {
    viewport: Viewport,
    candidates: Vec<ClickCandidate>,
}

pub(crate) const MEASURE_SCRIPT: &str = r#"(() => {
  const roles = new Set(['link', 'button', 'listitem', 'option', 'menuitem', 'tab']);
  const skipped = new Set(['html', 'body', 'head', 'nav', 'header', 'footer', 'input', 'select', 'textarea']);
  const candidates = [];
  document.querySelectorAll('*').forEach((el) => {
    const tag = el.tagName.toLowerCase();
    if (skipped.has(tag)) { return; }
    const interactive = roles.has(el.getAttribute('role'))
      || tag === 'a' || tag === 'button'
      || el.hasAttribute('tabindex')
      || el.hasAttribute('data-href') || el.hasAttribute('data-to');
    if (!interactive && window.getComputedStyle(el).cursor !== 'pointer') { return; }
    const rect = el.getBoundingClientRect();
    const text = (el.textContent || '').trim().replace(/\s+/g, ' ').slice(0, 100);
    candidates.push({ left: rect.left, top: rect.top, width: rect.width, height: rect.height, text, tag });
  });
  return { viewport: { width: window.innerWidth, height: window.innerHeight }, candidates };
})()"#;

#[async_trait]
impl ClickableFinder for DomClickableFinder {
    async fn find(&self, page: &dyn BrowserPage) -> Result<Vec<ClickTarget>, BrowserError> {
        let raw = page.evaluate(MEASURE_SCRIPT).await?;
        let measurement: Measurement = serde_json::from_value(raw)
            .map_err(|err| BrowserError::Script(format!("clickable measurement: {err}")))?;
        Ok(select_click_targets(measurement.candidates, measurement.viewport))
    }
}

/// Reduce measured candidates to click targets.
///
/// Keeps candidates of at least 60×30px that lie horizontally within the
/// viewport and no further than three viewport heights down, and that carry
/// text (anchors are exempt). Of nested candidates only the innermost one
/// survives. Survivors are ordered largest area first and collapsed when
/// their centers fall within [`PROXIMITY_PX`] of an earlier target.
pub fn select_click_targets(
    candidates: Vec<ClickCandidate>,
    viewport: Viewport,
) -> Vec<ClickTarget> {
    let eligible: Vec<ClickCandidate> = candidates
        .into_iter()
        .filter(|c| c.width >= MIN_WIDTH && c.height >= MIN_HEIGHT)
        .filter(|c| c.top <= viewport.height * 3.0 && c.bottom() >= 0.0)
        .filter(|c| c.left <= viewport.width && c.right() >= 0.0)
        .filter(|c| !c.text.trim().is_empty() || c.tag == "a")
        .collect();

    let innermost = eligible.iter().enumerate().filter(|(idx, candidate)| {
        !eligible.iter().enumerate().any(|(other_idx, other)| {
            if other_idx == *idx || !candidate.contains(other) {
                return false;
            }
            // Identical boxes: the later (deeper) element wins.
            other.area() < candidate.area() || other_idx > *idx
        })
    });

    let mut targets: Vec<ClickTarget> = innermost
        .map(|(_, c)| ClickTarget {
            x: c.left + c.width / 2.0,
            y: c.top + c.height / 2.0,
            width: c.width,
            height: c.height,
            text: c.text.trim().chars().take(MAX_TEXT_CHARS).collect(),
            tag: c.tag.clone(),
        })
        .collect();

    targets.sort_by(|a, b| b.area().total_cmp(&a.area()));

    let mut deduped: Vec<ClickTarget> = Vec::with_capacity(targets.len());
    for target in targets {
        let overlaps = deduped.iter().any(|kept| {
            (kept.x - target.x).abs() < PROXIMITY_PX
                && (kept.y - target.y).abs() < PROXIMITY_PX
        });
        if !overlaps {
            deduped.push(target);
        }
    }
    deduped
}
