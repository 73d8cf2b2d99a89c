//! Input-stream abstractions consumed by the prediction engine: character
//! streams for the lexer, token streams with marked rewind for the parser,
//! and the token/factory types that flow between them.

pub mod char_stream;
pub mod error;
pub mod token;
pub mod token_stream;

pub use char_stream::{CharStream, InputStream};
pub use error::StreamError;
pub use token::{DefaultTokenFactory, Token, TokenFactory, TokenSource, DEFAULT_CHANNEL, EOF_TYPE, HIDDEN_CHANNEL};
pub use token_stream::{BufferedTokenStream, TokenProducer, TokenStream};
