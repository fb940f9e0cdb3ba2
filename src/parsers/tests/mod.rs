mod html_tests;
mod text_tests;
