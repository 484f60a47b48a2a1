pub mod wem;
