use crate::canvas::Canvas;
use crate::flowable::Flowable;
use crate::types::{Pt, Rect};

pub enum AddResult {
    Placed,
    Split(Box<dyn Flowable>),
    Overflow(Box<dyn Flowable>),
}

/// A rectangular region that flowing content fills top to bottom.
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_y <= Pt::ZERO
    }

    pub fn add(&mut self, flowable: Box<dyn Flowable>, canvas: &mut Canvas) -> AddResult {
        let avail_width = self.rect.width;
        let avail_height = self.remaining_height();
        if avail_height <= Pt::ZERO {
            return AddResult::Overflow(flowable);
        }

        let size = flowable.wrap(avail_width, avail_height);
        if size.height <= avail_height {
            flowable.draw(
                canvas,
                self.rect.x,
                self.rect.y + self.cursor_y,
                avail_width,
                avail_height,
            );
            self.cursor_y += size.height;
            return AddResult::Placed;
        }

        if let Some((first, second)) = flowable.split(avail_width, avail_height) {
            let first_size = first.wrap(avail_width, avail_height);
            if first_size.height > Pt::ZERO && first_size.height <= avail_height {
                first.draw(
                    canvas,
                    self.rect.x,
                    self.rect.y + self.cursor_y,
                    avail_width,
                    avail_height,
                );
                self.cursor_y += first_size.height;
                return AddResult::Split(second);
            }
        }

        // An unsplittable flowable taller than a whole empty frame is placed
        // anyway so pagination keeps moving forward instead of hard-failing.
        if self.is_empty() {
            flowable.draw(
                canvas,
                self.rect.x,
                self.rect.y + self.cursor_y,
                avail_width,
                avail_height,
            );
            self.cursor_y = self.rect.height;
            return AddResult::Placed;
        }

        AddResult::Overflow(flowable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::{HELVETICA, Paragraph, Spacer, TextStyle};
    use crate::types::Size;

    fn frame(height: f32) -> Frame {
        Frame::new(Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: Pt::from_f32(200.0),
            height: Pt::from_f32(height),
        })
    }

    #[test]
    fn placed_advances_cursor() {
        let mut frame = frame(100.0);
        let mut canvas = Canvas::new(Size::letter());
        let result = frame.add(Box::new(Spacer::new(30.0)), &mut canvas);
        assert!(matches!(result, AddResult::Placed));
        assert_eq!(frame.remaining_height(), Pt::from_f32(70.0));
    }

    #[test]
    fn full_frame_overflows() {
        let mut frame = frame(40.0);
        let mut canvas = Canvas::new(Size::letter());
        assert!(matches!(
            frame.add(Box::new(Spacer::new(40.0)), &mut canvas),
            AddResult::Placed
        ));
        assert!(matches!(
            frame.add(Box::new(Spacer::new(1.0)), &mut canvas),
            AddResult::Overflow(_)
        ));
    }

    #[test]
    fn tall_paragraph_splits_at_frame_boundary() {
        let mut frame = frame(12.0);
        let mut canvas = Canvas::new(Size::letter());
        let style = TextStyle::new(HELVETICA, 10.0, 12.0);
        let para = Paragraph::new("one two three four five six seven eight nine ten", style);
        let result = frame.add(Box::new(para), &mut canvas);
        assert!(matches!(result, AddResult::Split(_)));
        assert_eq!(frame.remaining_height(), Pt::ZERO);
    }
}
