//! Token emission helpers.

use crate::html5::shared::{Input, Tag, Token};
use crate::html5::tokenizer::Html5Tokenizer;

impl Html5Tokenizer {
    pub(super) fn emit_token(&mut self, token: Token) {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "html5.tokenizer", "emit token: {token:?}");
        self.tokens.push(token);
        self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
    }

    /// Emit the tag under construction.
    ///
    /// Duplicate attributes are discarded here, keeping the first
    /// occurrence; names are compared byte-exact (they are already
    /// lowercased in the buffer). The name span stays in the scratch tag:
    /// the close-tag-match state compares against it while the content
    /// model is RCDATA or CDATA.
    pub(super) fn emit_current_tag(&mut self, input: &Input) {
        let attrs = &mut self.current_tag.attributes;
        let mut i = 0;
        while i < attrs.len() {
            let mut j = i + 1;
            while j < attrs.len() {
                if attrs[i].name.len() == attrs[j].name.len()
                    && input.compare_range_cs(
                        attrs[i].name.start,
                        attrs[j].name.start,
                        attrs[i].name.len(),
                    )
                {
                    attrs.remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        let tag = Tag {
            name: self.current_tag.name,
            attributes: std::mem::take(&mut self.current_tag.attributes),
            self_closing: self.current_tag.self_closing,
        };
        if self.current_tag_is_end {
            self.emit_token(Token::EndTag { tag });
        } else {
            self.emit_token(Token::StartTag { tag });
            // Content-model sync point: let the tree builder react to this
            // tag before the machine consumes what follows it.
            self.paused = true;
        }
    }

    /// Emit the doctype under construction. `correct` is derived from the
    /// name at every emission point so truncated doctypes still satisfy the
    /// name contract.
    pub(super) fn emit_doctype(&mut self, input: &Input, force_quirks: bool) {
        let mut doctype = self.current_doctype;
        doctype.correct =
            !doctype.name.is_empty() && input.compare_span_ascii_ci(doctype.name, b"HTML");
        doctype.force_quirks = force_quirks;
        self.emit_token(Token::Doctype { doctype });
    }
}
