use serde_json::Value;
use std::fmt;

/// How the children of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
  And,
  Or,
}

impl Combinator {
  pub(crate) fn separator(self) -> &'static str {
    match self {
      Self::And => " AND ",
      Self::Or => " OR ",
    }
  }

  /// The value of an empty group.
  pub(crate) fn identity(self) -> &'static str {
    match self {
      Self::And => "TRUE",
      Self::Or => "FALSE",
    }
  }
}

/// Comparison operators a condition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Equal,
  NotEqual,
  Less,
  LessOrEqual,
  Greater,
  GreaterOrEqual,
  In,
  NotIn,
  Between,
  NotBetween,
  BeginsWith,
  NotBeginsWith,
  Contains,
  NotContains,
  EndsWith,
  NotEndsWith,
  IsEmpty,
  IsNotEmpty,
  IsNull,
  IsNotNull,
}

static OPERATORS: &[(&str, Operator)] = &[
  ("equal", Operator::Equal),
  ("not_equal", Operator::NotEqual),
  ("less", Operator::Less),
  ("less_or_equal", Operator::LessOrEqual),
  ("greater", Operator::Greater),
  ("greater_or_equal", Operator::GreaterOrEqual),
  ("in", Operator::In),
  ("not_in", Operator::NotIn),
  ("between", Operator::Between),
  ("not_between", Operator::NotBetween),
  ("begins_with", Operator::BeginsWith),
  ("not_begins_with", Operator::NotBeginsWith),
  ("contains", Operator::Contains),
  ("not_contains", Operator::NotContains),
  ("ends_with", Operator::EndsWith),
  ("not_ends_with", Operator::NotEndsWith),
  ("is_empty", Operator::IsEmpty),
  ("is_not_empty", Operator::IsNotEmpty),
  ("is_null", Operator::IsNull),
  ("is_not_null", Operator::IsNotNull),
];

impl Operator {
  /// Every operator, in the order clients know them.
  pub fn all() -> impl Iterator<Item = Operator> {
    OPERATORS.iter().map(|(_, op)| *op)
  }

  pub fn from_name(name: &str) -> Option<Self> {
    OPERATORS
      .iter()
      .find(|(n, _)| *n == name)
      .map(|(_, op)| *op)
  }

  pub fn name(self) -> &'static str {
    OPERATORS
      .iter()
      .find(|(_, op)| *op == self)
      .map(|(n, _)| *n)
      .unwrap_or("unknown")
  }

  /// Shape of the value this operator expects.
  pub fn operand(self) -> Operand {
    match self {
      Self::Equal
      | Self::NotEqual
      | Self::Less
      | Self::LessOrEqual
      | Self::Greater
      | Self::GreaterOrEqual => Operand::Scalar,
      Self::In | Self::NotIn => Operand::List,
      Self::Between | Self::NotBetween => Operand::Range,
      Self::BeginsWith
      | Self::NotBeginsWith
      | Self::Contains
      | Self::NotContains
      | Self::EndsWith
      | Self::NotEndsWith => Operand::Text,
      Self::IsEmpty | Self::IsNotEmpty | Self::IsNull | Self::IsNotNull => Operand::None,
    }
  }
}

impl fmt::Display for Operator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
  /// No value.
  None,
  /// One value of any JSON type.
  Scalar,
  /// A list of values, bound as one array.
  List,
  /// Exactly two values.
  Range,
  /// One string, used as a LIKE pattern.
  Text,
}

impl Operand {
  /// Literals a condition with this operand binds into the predicate.
  pub fn literal_count(self) -> usize {
    match self {
      Self::None => 0,
      Self::Scalar | Self::List | Self::Text => 1,
      Self::Range => 2,
    }
  }
}

/// A parsed filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
  Condition {
    column: String,
    operator: Operator,
    value: Value,
  },
  Group {
    combinator: Combinator,
    negated: bool,
    rules: Vec<RuleNode>,
  },
}

impl RuleNode {
  /// Number of condition leaves in the tree.
  pub fn leaf_count(&self) -> usize {
    match self {
      Self::Condition { .. } => 1,
      Self::Group { rules, .. } => rules.iter().map(RuleNode::leaf_count).sum(),
    }
  }

  /// Literals the compiled predicate binds: each leaf contributes its
  /// operand's count.
  pub fn literal_count(&self) -> usize {
    match self {
      Self::Condition { operator, .. } => operator.operand().literal_count(),
      Self::Group { rules, .. } => rules.iter().map(RuleNode::literal_count).sum(),
    }
  }
}
