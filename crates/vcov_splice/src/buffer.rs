//! Segment list with origin tracking, the replace window and insertion marks.

use crate::error::SpliceError;
use vcov_source::SourcePos;

type SegId = usize;

#[derive(Debug)]
struct Segment {
    text: String,
    /// Original position of the first character, for source text.
    origin: Option<SourcePos>,
    prev: Option<SegId>,
    next: Option<SegId>,
}

/// Original-source extent emitted since the last [`SpliceBuffer::flush_pending`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    start: SourcePos,
    end: SourcePos,
}

/// Streaming output for one generated file.
///
/// Unflushed output is split into a held region and a work region. The
/// work region starts at the first text emitted after the last
/// [`flush_pending`](Self::flush_pending) and is the only place
/// [`replace`](Self::replace) and [`prepend`](Self::prepend) act on.
/// Register insertion marks always point into the held region.
#[derive(Debug)]
pub struct SpliceBuffer {
    segs: Vec<Segment>,
    head: Option<SegId>,
    tail: Option<SegId>,
    work_start: Option<SegId>,
    window: Option<Window>,
    /// Insert-after cursors; `None` inserts at the head.
    marks: Vec<Option<SegId>>,
    line_len: usize,
    max_line_length: usize,
}

impl SpliceBuffer {
    /// Creates an empty buffer with the given output line ceiling.
    pub fn new(max_line_length: usize) -> Self {
        Self {
            segs: Vec::new(),
            head: None,
            tail: None,
            work_start: None,
            window: None,
            marks: Vec::new(),
            line_len: 0,
            max_line_length,
        }
    }

    /// Returns `true` when nothing is waiting to be flushed.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns `true` while a replace window is open.
    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    /// Number of active register insertion marks.
    pub fn mark_depth(&self) -> usize {
        self.marks.len()
    }

    fn new_seg(&mut self, text: &str, origin: Option<SourcePos>) -> SegId {
        self.segs.push(Segment {
            text: text.to_string(),
            origin,
            prev: None,
            next: None,
        });
        self.segs.len() - 1
    }

    fn link_after(&mut self, after: Option<SegId>, id: SegId) {
        let next = match after {
            Some(a) => self.segs[a].next,
            None => self.head,
        };
        self.segs[id].prev = after;
        self.segs[id].next = next;
        match after {
            Some(a) => self.segs[a].next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(n) => self.segs[n].prev = Some(id),
            None => self.tail = Some(id),
        }
    }

    fn append(&mut self, text: &str, origin: Option<SourcePos>) {
        let id = self.new_seg(text, origin);
        self.link_after(self.tail, id);
        if self.work_start.is_none() {
            self.work_start = Some(id);
        }
    }

    /// Appends text to the open line.
    ///
    /// Original-source text opens the replace window if none is open and
    /// extends its end to the text's last character. Embedded newlines seal
    /// lines; source positions continue at column 1 of the next line.
    pub fn emit(&mut self, text: &str, first: SourcePos, from_source: bool) -> Result<(), SpliceError> {
        let mut pos = first;
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.append("\n", None);
                self.line_len = 0;
                pos = SourcePos::new(pos.line + 1, 1);
            }
            if piece.is_empty() {
                continue;
            }
            let len = piece.chars().count();
            self.append(piece, from_source.then_some(pos));
            self.line_len += len;
            if from_source {
                let end = pos.last_of(piece);
                match &mut self.window {
                    Some(w) => w.end = end,
                    None => self.window = Some(Window { start: pos, end }),
                }
            }
            if self.line_len > self.max_line_length {
                return Err(SpliceError::LineTooLong {
                    line: pos.line,
                    limit: self.max_line_length,
                });
            }
            pos.col += len as u32;
        }
        Ok(())
    }

    /// Appends synthesized text.
    pub fn emit_synthesized(&mut self, text: &str) -> Result<(), SpliceError> {
        self.emit(text, SourcePos::new(0, 0), false)
    }

    /// Swaps the original text `first..=last` for `text`.
    ///
    /// A no-op when no window is open. Both ends must lie inside the window
    /// and still be present in the work region.
    pub fn replace(&mut self, text: &str, first: SourcePos, last: SourcePos) -> Result<(), SpliceError> {
        let Some(window) = self.window else {
            tracing::debug!(%first, %last, "replace without an open window ignored");
            return Ok(());
        };
        if first < window.start || last > window.end || last < first {
            return Err(SpliceError::OutsideWindow {
                first,
                last,
                start: window.start,
                end: window.end,
            });
        }
        let (a, a_off) = self.locate(first)?;
        let start = if a_off > 0 { self.split(a, a_off) } else { a };
        let (b, b_off) = self.locate(last)?;
        if b_off + 1 < self.segs[b].text.chars().count() {
            self.split(b, b_off + 1);
        }

        let before = self.segs[start].prev;
        let after = self.segs[b].next;
        let mut removed = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            removed.push(id);
            if id == b {
                break;
            }
            cursor = self.segs[id].next;
        }
        match before {
            Some(p) => self.segs[p].next = after,
            None => self.head = after,
        }
        match after {
            Some(n) => self.segs[n].prev = before,
            None => self.tail = before,
        }

        let id = self.new_seg(text, None);
        self.link_after(before, id);
        if self.work_start.is_some_and(|w| removed.contains(&w)) {
            self.work_start = Some(id);
        }
        for mark in self.marks.iter_mut() {
            if mark.is_some_and(|m| removed.contains(&m)) {
                *mark = Some(id);
            }
        }
        Ok(())
    }

    /// Finds the segment holding original position `pos` and the character
    /// offset of `pos` inside it.
    fn locate(&self, pos: SourcePos) -> Result<(SegId, usize), SpliceError> {
        let mut cursor = self.work_start;
        while let Some(id) = cursor {
            let seg = &self.segs[id];
            if let Some(origin) = seg.origin {
                let len = seg.text.chars().count() as u32;
                if origin.line == pos.line && origin.col <= pos.col && pos.col < origin.col + len {
                    return Ok((id, (pos.col - origin.col) as usize));
                }
            }
            cursor = seg.next;
        }
        Err(SpliceError::NotBuffered { pos })
    }

    /// Splits `id` before character `at`; returns the new second half.
    fn split(&mut self, id: SegId, at: usize) -> SegId {
        let byte = self.segs[id]
            .text
            .char_indices()
            .nth(at)
            .map_or(self.segs[id].text.len(), |(b, _)| b);
        let rest = self.segs[id].text.split_off(byte);
        let origin = self.segs[id]
            .origin
            .map(|o| SourcePos::new(o.line, o.col + at as u32));
        let new = self.new_seg(&rest, origin);
        self.link_after(Some(id), new);
        new
    }

    /// Inserts text immediately before the work region.
    pub fn prepend(&mut self, text: &str) {
        let id = self.new_seg(text, None);
        match self.work_start {
            Some(w) => self.link_after(self.segs[w].prev, id),
            None => self.link_after(self.tail, id),
        }
        self.work_start = Some(id);
    }

    /// Moves the work region into the held region and closes the window.
    pub fn flush_pending(&mut self) {
        self.work_start = None;
        self.window = None;
    }

    /// Returns all unflushed text and empties the buffer.
    ///
    /// Fails if register insertion marks still point into the output.
    pub fn flush_held(&mut self) -> Result<String, SpliceError> {
        if !self.marks.is_empty() {
            return Err(SpliceError::MarksOutstanding(self.marks.len()));
        }
        self.flush_pending();
        let out = self.contents();
        self.segs.clear();
        self.head = None;
        self.tail = None;
        Ok(out)
    }

    /// Serializes the unflushed output without consuming it.
    pub fn contents(&self) -> String {
        let mut out = String::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            out.push_str(&self.segs[id].text);
            cursor = self.segs[id].next;
        }
        out
    }

    /// Pushes a register insertion mark at the current tail.
    pub fn push_mark(&mut self) {
        self.flush_pending();
        self.marks.push(self.tail);
    }

    /// Pops the innermost register insertion mark.
    pub fn pop_mark(&mut self) -> Result<(), SpliceError> {
        self.marks.pop().map(|_| ()).ok_or(SpliceError::NoMark)
    }

    /// Inserts a declaration at the innermost mark. Successive insertions
    /// at the same mark keep their order.
    pub fn insert_at_mark(&mut self, text: &str) -> Result<(), SpliceError> {
        let Some(mark) = self.marks.last().copied() else {
            return Err(SpliceError::NoMark);
        };
        let id = self.new_seg(text, None);
        self.link_after(mark, id);
        if let Some(top) = self.marks.last_mut() {
            *top = Some(id);
        }
        Ok(())
    }
}
