use crate::assets::photo::Photo;
use crate::effects::cover::{Compositor, CoverBox};
use crate::effects::transitions::{TransitionKind, render_transition};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::target::RenderTarget;
use crate::timeline::segment::FrameInstruction;

/// Draw one timeline instruction into `target`.
///
/// Returns `false` for [`FrameInstruction::EndOfStream`], leaving the target untouched.
pub fn render_instruction(
    compositor: &mut Compositor,
    target: &mut RenderTarget,
    photos: &[Photo],
    transition: TransitionKind,
    instruction: FrameInstruction,
) -> SlidecastResult<bool> {
    match instruction {
        FrameInstruction::Hold { photo } => {
            let p = photo_at(photos, photo)?;
            target.clear();
            let full = CoverBox::full(target);
            compositor.draw_cover(target, p, full, 1.0)?;
            Ok(true)
        }
        FrameInstruction::Transition { from, to, progress } => {
            let a = photo_at(photos, from)?;
            let b = photo_at(photos, to)?;
            render_transition(compositor, target, transition, a, b, progress as f32)?;
            Ok(true)
        }
        FrameInstruction::EndOfStream => Ok(false),
    }
}

fn photo_at(photos: &[Photo], idx: usize) -> SlidecastResult<&Photo> {
    photos.get(idx).ok_or_else(|| {
        SlidecastError::render(format!(
            "instruction references photo {idx}, but only {} are loaded",
            photos.len()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
