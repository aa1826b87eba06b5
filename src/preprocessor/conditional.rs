//! Conditional compilation state (`#if` ... `#endif`)

use crate::errors::DirectiveError;
use crate::parser::ast::SourceLocation;

/// One `#if` / `#ifdef` / `#ifndef` level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    /// The current branch of this frame was taken
    branch_active: bool,
    /// Some branch of this frame has been taken already
    any_taken: bool,
    /// Everything enclosing this frame is active
    parent_active: bool,
    seen_else: bool,
    /// Where the frame was opened
    location: SourceLocation,
}

#[derive(Debug, Clone, Default)]
pub struct ConditionalStack {
    frames: Vec<Frame>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether source at this point is compiled
    pub fn is_active(&self) -> bool {
        self.frames
            .last()
            .map_or(true, |f| f.parent_active && f.branch_active)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a frame. `taken` is ignored (and should not have been computed)
    /// when the enclosing region is inactive.
    pub fn push(&mut self, taken: bool, location: SourceLocation) {
        let parent_active = self.is_active();
        let taken = parent_active && taken;
        self.frames.push(Frame {
            branch_active: taken,
            any_taken: taken,
            parent_active,
            seen_else: false,
            location,
        });
    }

    /// Check that an `#elif` is legal here and report whether its condition
    /// must be evaluated. When it need not be, the frame is already updated.
    pub fn elif_needs_evaluation(&mut self, location: SourceLocation) -> Result<bool, DirectiveError> {
        let frame = self.frames.last_mut().ok_or_else(|| DirectiveError::Orphan {
            directive: "elif".to_string(),
            location,
        })?;
        if frame.seen_else {
            return Err(DirectiveError::AfterElse {
                directive: "elif".to_string(),
                location,
            });
        }
        if !frame.parent_active || frame.any_taken {
            frame.branch_active = false;
            return Ok(false);
        }
        Ok(true)
    }

    /// Record the outcome of an evaluated `#elif`.
    pub fn elif(&mut self, taken: bool) {
        if let Some(frame) = self.frames.last_mut() {
            frame.branch_active = taken;
            frame.any_taken |= taken;
        }
    }

    pub fn else_(&mut self, location: SourceLocation) -> Result<(), DirectiveError> {
        let frame = self.frames.last_mut().ok_or_else(|| DirectiveError::Orphan {
            directive: "else".to_string(),
            location,
        })?;
        if frame.seen_else {
            return Err(DirectiveError::AfterElse {
                directive: "else".to_string(),
                location,
            });
        }
        frame.branch_active = !frame.any_taken;
        frame.any_taken = true;
        frame.seen_else = true;
        Ok(())
    }

    pub fn endif(&mut self, location: SourceLocation) -> Result<(), DirectiveError> {
        self.frames
            .pop()
            .map(|_| ())
            .ok_or(DirectiveError::UnmatchedEndif { location })
    }

    /// Fail if frames opened above `depth` are still open.
    pub fn finish_to(&self, depth: usize) -> Result<(), DirectiveError> {
        match self.frames.get(depth..).and_then(|open| open.last()) {
            Some(frame) => Err(DirectiveError::UnterminatedConditional {
                location: frame.location,
            }),
            None => Ok(()),
        }
    }

    /// Fail if any frame is still open.
    pub fn finish(&self) -> Result<(), DirectiveError> {
        self.finish_to(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize) -> SourceLocation {
        SourceLocation::new(line, 1)
    }

    #[test]
    fn test_exactly_one_branch_taken() {
        let mut stack = ConditionalStack::new();
        stack.push(false, loc(1));
        assert!(!stack.is_active());

        assert!(stack.elif_needs_evaluation(loc(2)).unwrap());
        stack.elif(true);
        assert!(stack.is_active());

        // Already taken: no evaluation, branch off
        assert!(!stack.elif_needs_evaluation(loc(3)).unwrap());
        assert!(!stack.is_active());

        stack.else_(loc(4)).unwrap();
        assert!(!stack.is_active());

        stack.endif(loc(5)).unwrap();
        assert!(stack.is_active());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_else_taken_when_nothing_else_was() {
        let mut stack = ConditionalStack::new();
        stack.push(false, loc(1));
        stack.else_(loc(2)).unwrap();
        assert!(stack.is_active());
    }

    #[test]
    fn test_nested_inside_inactive_never_activates() {
        let mut stack = ConditionalStack::new();
        stack.push(false, loc(1));
        stack.push(true, loc(2));
        assert!(!stack.is_active());
        assert!(!stack.elif_needs_evaluation(loc(3)).unwrap());
        stack.else_(loc(4)).unwrap();
        assert!(!stack.is_active());
        stack.endif(loc(5)).unwrap();
        stack.else_(loc(6)).unwrap();
        assert!(stack.is_active());
    }

    #[test]
    fn test_misplaced_directives() {
        let mut stack = ConditionalStack::new();
        assert!(matches!(stack.else_(loc(1)), Err(DirectiveError::Orphan { .. })));
        assert!(matches!(
            stack.elif_needs_evaluation(loc(1)),
            Err(DirectiveError::Orphan { .. })
        ));
        assert!(matches!(stack.endif(loc(1)), Err(DirectiveError::UnmatchedEndif { .. })));

        stack.push(true, loc(2));
        stack.else_(loc(3)).unwrap();
        assert!(matches!(stack.else_(loc(4)), Err(DirectiveError::AfterElse { .. })));
        assert!(matches!(
            stack.elif_needs_evaluation(loc(5)),
            Err(DirectiveError::AfterElse { .. })
        ));
    }

    #[test]
    fn test_finish_reports_innermost_open_frame() {
        let mut stack = ConditionalStack::new();
        stack.push(true, loc(1));
        stack.push(true, loc(7));
        assert_eq!(
            stack.finish(),
            Err(DirectiveError::UnterminatedConditional { location: loc(7) })
        );
        assert!(stack.finish_to(2).is_ok());
    }
}
