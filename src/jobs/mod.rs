pub mod view_count_increment;
