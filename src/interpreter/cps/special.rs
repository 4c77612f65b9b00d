use phf::phf_map;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SpecialForm {
    Def,
    Defn,
    Defmacro,
    Defsyntax,
    Let,
    Do,
    If,
    Fn,
    Macro,
    Quote,
    Quasiquote,
    Macroexpand,
    Eval,
    And,
    Or,
}

pub static SPECIAL_FORMS: phf::Map<&'static str, SpecialForm> = phf_map! {
    "def" => SpecialForm::Def,
    "defn" => SpecialForm::Defn,
    "defmacro" => SpecialForm::Defmacro,
    "defsyntax" => SpecialForm::Defsyntax,
    "let" => SpecialForm::Let,
    "do" => SpecialForm::Do,
    "if" => SpecialForm::If,
    "fn" => SpecialForm::Fn,
    "macro" => SpecialForm::Macro,
    "quote" => SpecialForm::Quote,
    "quasiquote" => SpecialForm::Quasiquote,
    "macroexpand" => SpecialForm::Macroexpand,
    "eval" => SpecialForm::Eval,
    "and" => SpecialForm::And,
    "or" => SpecialForm::Or,
};
