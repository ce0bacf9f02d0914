pub use toad_msg::Code;

macro_rules! code {
  (rfc7252($section:literal) $name:ident = $c:literal . $d:literal) => {
    #[doc = toad_macros::rfc_7252_doc!($section)]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: toad_msg::Code = toad_msg::Code::new($c, $d);
  };
  (rfc7252($section:literal) $name:ident = $newtype:tt($c:literal . $d:literal)) => {
    #[doc = toad_macros::rfc_7252_doc!($section)]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: $newtype = $newtype(toad_msg::Code::new($c, $d));
  };
}

pub(crate) use code;

// 2.xx
code!(rfc7252("5.9.1.1") CREATED = 2 . 01);
code!(rfc7252("5.9.1.2") DELETED = 2 . 02);
code!(rfc7252("5.9.1.4") CHANGED = 2 . 04);
code!(rfc7252("5.9.1.5") CONTENT = 2 . 05);

// 4.xx
code!(rfc7252("5.9.2.1") BAD_REQUEST        = 4 . 00);
code!(rfc7252("5.9.2.5") NOT_FOUND          = 4 . 04);
code!(rfc7252("5.9.2.6") METHOD_NOT_ALLOWED = 4 . 05);

// 5.xx
code!(rfc7252("5.9.3.1") INTERNAL_SERVER_ERROR = 5 . 00);
code!(rfc7252("5.9.3.2") NOT_IMPLEMENTED       = 5 . 01);

/// Is this a 2.xx code?
pub fn is_success(code: Code) -> bool {
  code.class == 2
}

/// Render a code as `class.detail`, e.g. `4.04`
pub fn to_human(code: Code) -> [u8; 4] {
  let digit = |n: u8| b'0' + (n % 10);
  [digit(code.class), b'.', digit(code.detail / 10), digit(code.detail)]
}
