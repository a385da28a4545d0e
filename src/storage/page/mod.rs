mod hash_bucket_page;
mod hash_directory_page;
mod slotted_page;
mod table_page;

pub use hash_bucket_page::*;
pub use hash_directory_page::*;
pub use slotted_page::*;
pub use table_page::*;
