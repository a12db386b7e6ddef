//! Tokenizer state machine definitions.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenizerState {
    Data,
    EntityData,
    TagOpen,
    CloseTagOpen,
    CloseTagMatch,
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDq,
    AttributeValueSq,
    AttributeValueUq,
    EntityInAttributeValue,
    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    Comment,
    CommentDash,
    CommentEnd,
    MatchDoctype,
    Doctype,
    BeforeDoctypeName,
    DoctypeName,
    AfterDoctypeName,
    BogusDoctype,
    NumberedEntity,
    NamedEntity,
}
