//! Streaming parse session: bytes in, tree-handler calls out.
//!
//! Owns the whole pipeline (decoder, input, tokenizer, tree builder) and
//! drives it cooperatively: every drained token is fed to the builder before
//! the tokenizer resumes, and content-model directives from the builder are
//! applied at the tokenizer's start-tag sync points.

use crate::html5::shared::{ByteStreamDecoder, DocumentParseContext, Input};
use crate::html5::tokenizer::{Html5Tokenizer, TokenizeResult, TokenizerConfig};
use crate::html5::tree_builder::{
    Html5TreeBuilder, TreeBuilderConfig, TreeBuilderError, TreeBuilderStep, TreeHandler,
};

/// Streaming entry point over a [`TreeHandler`].
pub struct Html5ParseSession<H: TreeHandler> {
    ctx: DocumentParseContext,
    decoder: ByteStreamDecoder,
    input: Input,
    tokenizer: Html5Tokenizer,
    builder: Html5TreeBuilder<H>,
    finished: bool,
}

impl<H: TreeHandler> Html5ParseSession<H> {
    pub fn new(
        tokenizer_config: TokenizerConfig,
        builder_config: TreeBuilderConfig,
        handler: H,
    ) -> Self {
        Self {
            ctx: DocumentParseContext::new(),
            decoder: ByteStreamDecoder::new(),
            input: Input::new(),
            tokenizer: Html5Tokenizer::new(tokenizer_config),
            builder: Html5TreeBuilder::new(builder_config, handler),
            finished: false,
        }
    }

    /// Feed a chunk of document bytes and process as far as possible.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), TreeBuilderError> {
        debug_assert!(!self.finished, "push_bytes after finish");
        self.decoder.push_bytes(bytes, &mut self.input);
        self.pump()
    }

    /// Convenience for already-decoded text.
    pub fn push_str(&mut self, text: &str) -> Result<(), TreeBuilderError> {
        debug_assert!(!self.finished, "push_str after finish");
        self.input.push_str(text);
        self.pump()
    }

    /// Signal end of input and drain the pipeline to the EOF token.
    pub fn finish(&mut self) -> Result<(), TreeBuilderError> {
        if !self.finished {
            self.decoder.finish(&mut self.input);
            self.finished = true;
        }
        self.pump()
    }

    /// Parse errors and counters accumulated so far.
    pub fn ctx(&self) -> &DocumentParseContext {
        &self.ctx
    }

    pub fn handler(&self) -> &H {
        self.builder.handler()
    }

    pub fn quirks_mode(&self) -> bool {
        self.builder.quirks_mode()
    }

    fn pump(&mut self) -> Result<(), TreeBuilderError> {
        loop {
            let result = self.tokenizer.run(&mut self.input, &mut self.ctx);
            let batch = self.tokenizer.next_batch(&mut self.input);
            if batch.is_empty() {
                match result {
                    TokenizeResult::Progress => continue,
                    TokenizeResult::NeedMoreInput | TokenizeResult::EmittedEof => return Ok(()),
                }
            }
            let resolver = batch.resolver();
            for token in batch.iter() {
                match self.builder.push_token(token, &resolver, &mut self.ctx)? {
                    TreeBuilderStep::Continue => {}
                    TreeBuilderStep::SwitchContentModel(model) => {
                        self.tokenizer.set_content_model(model);
                    }
                }
            }
            drop(batch);
            if result == TokenizeResult::EmittedEof {
                return Ok(());
            }
        }
    }
}
