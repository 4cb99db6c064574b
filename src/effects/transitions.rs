use std::str::FromStr;

use crate::assets::photo::Photo;
use crate::effects::cover::{Compositor, CoverBox, blit_crossfade};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::target::RenderTarget;

/// How consecutive photos hand over to each other.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Linear cross-fade from A to B.
    #[default]
    #[serde(alias = "fade", alias = "crossfade")]
    Dissolve,
    /// B pushes in from the right edge while A exits to the left.
    Slide,
}

impl TransitionKind {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dissolve => "dissolve",
            Self::Slide => "slide",
        }
    }
}

impl FromStr for TransitionKind {
    type Err = SlidecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = s.trim().to_ascii_lowercase();
        if kind.is_empty() {
            return Err(SlidecastError::input("transition kind must be non-empty"));
        }
        match kind.as_str() {
            "dissolve" | "fade" | "crossfade" => Ok(Self::Dissolve),
            "slide" => Ok(Self::Slide),
            other => Err(SlidecastError::input(format!(
                "unknown transition kind '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render one transition frame between `a` and `b` at progress `t` in `[0, 1]`.
///
/// The target is cleared first. `t = 0` reproduces a plain cover draw of `a`; `t = 1`
/// reproduces `b`. Out-of-range or non-finite `t` is clamped.
pub fn render_transition(
    compositor: &mut Compositor,
    target: &mut RenderTarget,
    kind: TransitionKind,
    a: &Photo,
    b: &Photo,
    t: f32,
) -> SlidecastResult<()> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    target.clear();
    match kind {
        TransitionKind::Dissolve => render_dissolve(compositor, target, a, b, t),
        TransitionKind::Slide => render_slide(compositor, target, a, b, t),
    }
}

fn render_dissolve(
    compositor: &mut Compositor,
    target: &mut RenderTarget,
    a: &Photo,
    b: &Photo,
    t: f32,
) -> SlidecastResult<()> {
    let full = CoverBox::full(target);
    compositor.draw_cover(target, a, full, 1.0)?;
    let fitted_b = compositor.fitted(b, full.width, full.height)?;
    // a*(1-t) + b*t keeps opaque inputs opaque at every t.
    blit_crossfade(target, &fitted_b, full.x, full.y, t)
}

fn render_slide(
    compositor: &mut Compositor,
    target: &mut RenderTarget,
    a: &Photo,
    b: &Photo,
    t: f32,
) -> SlidecastResult<()> {
    let full = CoverBox::full(target);
    let width = i64::from(target.width());
    let offset = slide_offset_px(target.width(), t);
    compositor.draw_cover(target, a, full.translated_x(-offset), 1.0)?;
    compositor.draw_cover(target, b, full.translated_x(width - offset), 1.0)
}

/// Horizontal slide offset in whole pixels for progress `t`.
///
/// Monotonic in `t`; `0` at `t = 0` and `width` at `t = 1`.
pub fn slide_offset_px(width: u32, t: f32) -> i64 {
    (f64::from(width) * f64::from(t.clamp(0.0, 1.0))).round() as i64
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
