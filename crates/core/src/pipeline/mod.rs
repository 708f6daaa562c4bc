pub mod classify_image_use_case;
