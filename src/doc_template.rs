use crate::canvas::{Canvas, Document};
use crate::error::CoaError;
use crate::flowable::Flowable;
use crate::frame::AddResult;
use crate::page_template::{DocContext, PageTemplate};
use std::collections::VecDeque;

/// Lays a story of flowables into the frames of successive pages.
///
/// This is the collecting half of the two-pass render: every completed page
/// is captured into the canvas page list via `show_page` and nothing is
/// serialized until the whole story has been placed, so the caller knows the
/// final page count before any page is emitted.
pub struct DocTemplate {
    page_templates: Vec<PageTemplate>,
    story: Vec<Box<dyn Flowable>>,
}

impl DocTemplate {
    pub fn new(page_templates: Vec<PageTemplate>) -> Self {
        Self {
            page_templates,
            story: Vec::new(),
        }
    }

    pub fn add_flowable(&mut self, flowable: Box<dyn Flowable>) {
        self.story.push(flowable);
    }

    pub fn build(self) -> Result<Document, CoaError> {
        if self.page_templates.is_empty() {
            return Err(CoaError::MissingPageTemplate);
        }

        // Page n uses templates[min(n-1, len-1)]: the last template repeats.
        fn select_template(page_templates: &[PageTemplate], page_number: usize) -> &PageTemplate {
            let idx = page_number.saturating_sub(1);
            &page_templates[idx.min(page_templates.len() - 1)]
        }

        let template = select_template(&self.page_templates, 1);
        let mut canvas = Canvas::new(template.page_size);
        let mut page_number = 1usize;
        let mut frames = template.instantiate_frames();
        let mut frame_index = 0usize;
        let mut placed_on_page = false;

        if let Some(callback) = template.on_page() {
            callback(&mut canvas, &DocContext::new(page_number, &template.name));
        }

        let mut story: VecDeque<Box<dyn Flowable>> = self.story.into();
        while let Some(flowable) = story.pop_front() {
            let mut current = flowable;
            loop {
                if frame_index >= frames.len() {
                    canvas.show_page();
                    page_number += 1;
                    let template = select_template(&self.page_templates, page_number);
                    frames = template.instantiate_frames();
                    frame_index = 0;
                    placed_on_page = false;
                    if let Some(callback) = template.on_page() {
                        callback(&mut canvas, &DocContext::new(page_number, &template.name));
                    }
                }

                if frames.is_empty() {
                    return Err(CoaError::MissingPageTemplate);
                }

                let is_last_frame = frame_index + 1 >= frames.len();
                let frame = &mut frames[frame_index];
                match frame.add(current, &mut canvas) {
                    AddResult::Placed => {
                        placed_on_page = true;
                        break;
                    }
                    AddResult::Split(remaining) => {
                        placed_on_page = true;
                        current = remaining;
                        frame_index += 1;
                    }
                    AddResult::Overflow(remaining) => {
                        if !placed_on_page && is_last_frame {
                            return Err(CoaError::UnplaceableFlowable(
                                remaining.debug_name().to_string(),
                            ));
                        }
                        current = remaining;
                        frame_index += 1;
                    }
                }
            }
        }

        canvas.show_page();
        Ok(canvas.finish_without_show())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::Spacer;
    use crate::types::{Pt, Rect, Size};

    fn template() -> PageTemplate {
        PageTemplate::new("main", Size::letter()).with_frame(Rect {
            x: Pt::from_f32(9.0),
            y: Pt::from_f32(9.0),
            width: Pt::from_f32(594.0),
            height: Pt::from_f32(100.0),
        })
    }

    #[test]
    fn story_flows_across_pages() {
        let mut doc = DocTemplate::new(vec![template()]);
        for _ in 0..5 {
            doc.add_flowable(Box::new(Spacer::new(60.0)));
        }
        let document = doc.build().expect("build");
        // 100pt frames hold one 60pt spacer each.
        assert_eq!(document.pages.len(), 5);
    }

    #[test]
    fn empty_story_still_produces_one_page() {
        let doc = DocTemplate::new(vec![template()]);
        let document = doc.build().expect("build");
        assert_eq!(document.pages.len(), 1);
    }

    #[test]
    fn missing_templates_is_an_error() {
        let doc = DocTemplate::new(Vec::new());
        assert!(matches!(doc.build(), Err(CoaError::MissingPageTemplate)));
    }

    #[test]
    fn on_page_runs_once_per_page() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let template = template().set_on_page(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut doc = DocTemplate::new(vec![template]);
        for _ in 0..3 {
            doc.add_flowable(Box::new(Spacer::new(90.0)));
        }
        let document = doc.build().expect("build");
        assert_eq!(document.pages.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
