//! Element types and the category tests the tree construction rules use.

/// Recognised HTML/MathML/SVG element names. Anything else is `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    A,
    Address,
    Applet,
    Area,
    B,
    Base,
    Basefont,
    Bgsound,
    Big,
    Blockquote,
    Body,
    Br,
    Button,
    Caption,
    Center,
    Code,
    Col,
    Colgroup,
    Dd,
    Dir,
    Div,
    Dl,
    Dt,
    Em,
    Embed,
    Fieldset,
    Font,
    Form,
    Frame,
    Frameset,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Head,
    Hr,
    Html,
    I,
    Iframe,
    Image,
    Img,
    Input,
    Isindex,
    Li,
    Link,
    Listing,
    Marquee,
    Menu,
    Meta,
    Nobr,
    Noembed,
    Noframes,
    Noscript,
    Object,
    Ol,
    Optgroup,
    Option,
    P,
    Param,
    Plaintext,
    Pre,
    Rp,
    Rt,
    Ruby,
    S,
    Script,
    Select,
    Small,
    Spacer,
    Span,
    Strike,
    Strong,
    Style,
    Sub,
    Sup,
    Table,
    Tbody,
    Td,
    Textarea,
    Tfoot,
    Th,
    Thead,
    Title,
    Tr,
    Tt,
    U,
    Ul,
    Var,
    Wbr,
    Xmp,
    // MathML
    Math,
    Mglyph,
    Malignmark,
    Mi,
    Mo,
    Mn,
    Ms,
    Mtext,
    // SVG
    Svg,
    Unknown,
}

impl ElementType {
    /// Map an already-lowercased tag name to its element type.
    pub fn from_name(name: &[u8]) -> Self {
        use ElementType::*;
        match name {
            b"a" => A,
            b"address" => Address,
            b"applet" => Applet,
            b"area" => Area,
            b"b" => B,
            b"base" => Base,
            b"basefont" => Basefont,
            b"bgsound" => Bgsound,
            b"big" => Big,
            b"blockquote" => Blockquote,
            b"body" => Body,
            b"br" => Br,
            b"button" => Button,
            b"caption" => Caption,
            b"center" => Center,
            b"code" => Code,
            b"col" => Col,
            b"colgroup" => Colgroup,
            b"dd" => Dd,
            b"dir" => Dir,
            b"div" => Div,
            b"dl" => Dl,
            b"dt" => Dt,
            b"em" => Em,
            b"embed" => Embed,
            b"fieldset" => Fieldset,
            b"font" => Font,
            b"form" => Form,
            b"frame" => Frame,
            b"frameset" => Frameset,
            b"h1" => H1,
            b"h2" => H2,
            b"h3" => H3,
            b"h4" => H4,
            b"h5" => H5,
            b"h6" => H6,
            b"head" => Head,
            b"hr" => Hr,
            b"html" => Html,
            b"i" => I,
            b"iframe" => Iframe,
            b"image" => Image,
            b"img" => Img,
            b"input" => Input,
            b"isindex" => Isindex,
            b"li" => Li,
            b"link" => Link,
            b"listing" => Listing,
            b"marquee" => Marquee,
            b"menu" => Menu,
            b"meta" => Meta,
            b"nobr" => Nobr,
            b"noembed" => Noembed,
            b"noframes" => Noframes,
            b"noscript" => Noscript,
            b"object" => Object,
            b"ol" => Ol,
            b"optgroup" => Optgroup,
            b"option" => Option,
            b"p" => P,
            b"param" => Param,
            b"plaintext" => Plaintext,
            b"pre" => Pre,
            b"rp" => Rp,
            b"rt" => Rt,
            b"ruby" => Ruby,
            b"s" => S,
            b"script" => Script,
            b"select" => Select,
            b"small" => Small,
            b"spacer" => Spacer,
            b"span" => Span,
            b"strike" => Strike,
            b"strong" => Strong,
            b"style" => Style,
            b"sub" => Sub,
            b"sup" => Sup,
            b"table" => Table,
            b"tbody" => Tbody,
            b"td" => Td,
            b"textarea" => Textarea,
            b"tfoot" => Tfoot,
            b"th" => Th,
            b"thead" => Thead,
            b"title" => Title,
            b"tr" => Tr,
            b"tt" => Tt,
            b"u" => U,
            b"ul" => Ul,
            b"var" => Var,
            b"wbr" => Wbr,
            b"xmp" => Xmp,
            b"math" => Math,
            b"mglyph" => Mglyph,
            b"malignmark" => Malignmark,
            b"mi" => Mi,
            b"mo" => Mo,
            b"mn" => Mn,
            b"ms" => Ms,
            b"mtext" => Mtext,
            b"svg" => Svg,
            _ => Unknown,
        }
    }

    /// Formatting category: elements tracked by the active formatting list.
    pub fn is_formatting(self) -> bool {
        use ElementType::*;
        matches!(
            self,
            A | B | Big | Code | Em | Font | I | Nobr | S | Small | Strike | Strong | Tt | U
        )
    }

    /// Scoping elements terminate the default in-scope walk.
    pub fn is_scoping(self) -> bool {
        use ElementType::*;
        matches!(
            self,
            Applet | Button | Caption | Html | Marquee | Object | Table | Td | Th
        )
    }

    /// Special category used by the in-body any-other-end-tag rule.
    pub fn is_special(self) -> bool {
        use ElementType::*;
        matches!(
            self,
            Address
                | Area
                | Base
                | Basefont
                | Bgsound
                | Blockquote
                | Body
                | Br
                | Center
                | Col
                | Colgroup
                | Dd
                | Dir
                | Div
                | Dl
                | Dt
                | Embed
                | Fieldset
                | Form
                | Frame
                | Frameset
                | H1
                | H2
                | H3
                | H4
                | H5
                | H6
                | Head
                | Hr
                | Iframe
                | Image
                | Img
                | Input
                | Isindex
                | Li
                | Link
                | Listing
                | Menu
                | Meta
                | Noembed
                | Noframes
                | Noscript
                | Ol
                | Optgroup
                | Option
                | P
                | Param
                | Plaintext
                | Pre
                | Script
                | Select
                | Spacer
                | Style
                | Tbody
                | Textarea
                | Tfoot
                | Thead
                | Title
                | Tr
                | Ul
                | Wbr
        )
    }

    pub fn is_special_or_scoping(self) -> bool {
        self.is_special() || self.is_scoping()
    }

    pub fn is_heading(self) -> bool {
        use ElementType::*;
        matches!(self, H1 | H2 | H3 | H4 | H5 | H6)
    }

    /// MathML text integration points delegate most start tags to the
    /// secondary mode while in foreign content.
    pub fn is_mathml_text_integration(self) -> bool {
        use ElementType::*;
        matches!(self, Mi | Mo | Mn | Ms | Mtext)
    }

    /// HTML-only tags that break out of foreign content.
    pub fn is_foreign_break_out(self) -> bool {
        use ElementType::*;
        matches!(
            self,
            B | Big
                | Blockquote
                | Body
                | Br
                | Center
                | Code
                | Dd
                | Div
                | Dl
                | Dt
                | Em
                | Embed
                | Font
                | H1
                | H2
                | H3
                | H4
                | H5
                | H6
                | Head
                | Hr
                | I
                | Img
                | Li
                | Listing
                | Menu
                | Meta
                | Nobr
                | Ol
                | P
                | Pre
                | Ruby
                | S
                | Small
                | Span
                | Strong
                | Strike
                | Sub
                | Sup
                | Table
                | Tt
                | U
                | Ul
                | Var
        )
    }
}

/// Scope test variants over the stack of open elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Default,
    ListItem,
    Button,
    Table,
}

#[cfg(test)]
mod tests {
    use super::ElementType;

    #[test]
    fn recognises_known_names() {
        assert_eq!(ElementType::from_name(b"table"), ElementType::Table);
        assert_eq!(ElementType::from_name(b"mtext"), ElementType::Mtext);
        assert_eq!(ElementType::from_name(b"svg"), ElementType::Svg);
        assert_eq!(ElementType::from_name(b"custom-x"), ElementType::Unknown);
    }

    #[test]
    fn category_membership() {
        assert!(ElementType::B.is_formatting());
        assert!(!ElementType::Div.is_formatting());
        assert!(ElementType::Table.is_scoping());
        assert!(ElementType::P.is_special());
        assert!(ElementType::Table.is_foreign_break_out());
        assert!(!ElementType::Svg.is_foreign_break_out());
    }
}
