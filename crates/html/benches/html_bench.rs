use criterion::{Criterion, black_box, criterion_group, criterion_main};
use html::html5::{
    AttrView, DocumentParseContext, Html5ParseSession, Html5Tokenizer, Input, Namespace,
    TokenizeResult, TokenizerConfig, TreeBuilderConfig, TreeHandler, TreeHandlerError,
};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

fn make_blocks(blocks: usize) -> String {
    let unit = "<div class=box><span>hello</span><img src=x></div>";
    let mut out = String::with_capacity(unit.len() * blocks);
    for _ in 0..blocks {
        out.push_str(unit);
    }
    out
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri");
        body.push('<');
        body.push_str("pt");
    }
    body.push_str("</script>");
    body
}

fn tokenize_all(text: &str) -> u64 {
    let mut ctx = DocumentParseContext::new();
    let mut tokenizer = Html5Tokenizer::new(TokenizerConfig::default());
    let mut input = Input::new();
    input.push_str(text);
    input.finish();
    let mut tokens = 0u64;
    loop {
        let result = tokenizer.run(&mut input, &mut ctx);
        let batch = tokenizer.next_batch(&mut input);
        tokens += batch.tokens().len() as u64;
        match result {
            TokenizeResult::Progress => {}
            TokenizeResult::NeedMoreInput | TokenizeResult::EmittedEof => {
                if batch.is_empty() {
                    break;
                }
            }
        }
    }
    tokens
}

/// No-op sink: measures parser cost, not DOM storage.
#[derive(Default)]
struct CountingSink {
    nodes: u64,
}

impl TreeHandler for CountingSink {
    type Handle = u64;

    fn document(&mut self) -> u64 {
        0
    }
    fn create_element(
        &mut self,
        _ns: Namespace,
        _name: &[u8],
        _attrs: &[AttrView<'_>],
    ) -> Result<u64, TreeHandlerError> {
        self.nodes += 1;
        Ok(self.nodes)
    }
    fn create_text(&mut self, _text: &[u8]) -> Result<u64, TreeHandlerError> {
        self.nodes += 1;
        Ok(self.nodes)
    }
    fn create_comment(&mut self, _text: &[u8]) -> Result<u64, TreeHandlerError> {
        self.nodes += 1;
        Ok(self.nodes)
    }
    fn create_doctype(
        &mut self,
        _name: &[u8],
        _public_id: Option<&[u8]>,
        _system_id: Option<&[u8]>,
    ) -> Result<u64, TreeHandlerError> {
        self.nodes += 1;
        Ok(self.nodes)
    }
    fn clone_node(&mut self, _node: &u64) -> Result<u64, TreeHandlerError> {
        self.nodes += 1;
        Ok(self.nodes)
    }
    fn append_child(&mut self, _parent: &u64, _child: &u64) -> Result<(), TreeHandlerError> {
        Ok(())
    }
    fn insert_before(
        &mut self,
        _parent: &u64,
        _child: &u64,
        _before: &u64,
    ) -> Result<(), TreeHandlerError> {
        Ok(())
    }
    fn detach(&mut self, _node: &u64) -> Result<(), TreeHandlerError> {
        Ok(())
    }
    fn reparent_children(&mut self, _from: &u64, _to: &u64) -> Result<(), TreeHandlerError> {
        Ok(())
    }
    fn get_parent(&mut self, _node: &u64) -> Result<Option<u64>, TreeHandlerError> {
        Ok(None)
    }
    fn add_attributes(&mut self, _node: &u64, _attrs: &[AttrView<'_>]) -> Result<(), TreeHandlerError> {
        Ok(())
    }
    fn associate_form(&mut self, _form: Option<&u64>, _node: &u64) -> Result<(), TreeHandlerError> {
        Ok(())
    }
    fn ref_node(&mut self, _node: &u64) {}
    fn unref_node(&mut self, _node: &u64) {}
}

fn full_parse(text: &str) -> u64 {
    let mut session = Html5ParseSession::new(
        TokenizerConfig::default(),
        TreeBuilderConfig::default(),
        CountingSink::default(),
    );
    session.push_bytes(text.as_bytes()).expect("push");
    session.finish().expect("finish");
    session.handler().nodes
}

fn bench_tokenize_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_tokenize_small", |b| {
        b.iter(|| black_box(tokenize_all(black_box(&input))));
    });
}

fn bench_tokenize_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_tokenize_large", |b| {
        b.iter(|| black_box(tokenize_all(black_box(&input))));
    });
}

fn bench_tokenize_rawtext_adversarial(c: &mut Criterion) {
    let input = make_rawtext_adversarial(256 * 1024);
    c.bench_function("bench_tokenize_rawtext_adversarial", |b| {
        b.iter(|| black_box(full_parse(black_box(&input))));
    });
}

fn bench_full_parse_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_full_parse_large", |b| {
        b.iter(|| black_box(full_parse(black_box(&input))));
    });
}

criterion_group!(
    benches,
    bench_tokenize_small,
    bench_tokenize_large,
    bench_tokenize_rawtext_adversarial,
    bench_full_parse_large
);
criterion_main!(benches);
