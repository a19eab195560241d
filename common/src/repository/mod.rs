pub mod repository_util;
