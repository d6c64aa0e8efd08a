pub mod block;
pub mod check;
pub mod form;
pub mod rules;

pub use block::{
    AddressProps, Block, BlockKind, BlockType, CaptchaProps, ChoiceProps, DateProps, FileProps,
    MediaProps, MenuItem, MenuProps, MultiChoiceProps, PhonePrefix, PhoneProps, RangeProps,
    RatingProps, TextProps, WelcomeProps,
};
pub use check::{SpecIssue, check_form};
pub use form::{FormPresentation, FormSpec, NavigationPolicy, PresentationMode};
pub use rules::{
    Condition, ConditionOperator, LogicOperator, Operand, RuleAction, Visibility, VisibilityRule,
};
