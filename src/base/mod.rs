mod buffer;

pub use self::buffer::TextBuffer;
