use crate::routes::View;
use maud::{Markup, Render, html};

pub fn render_table<const N: usize>(titles: [&'static str; N], items: Vec<[Markup; N]>) -> Markup {
    html! {
        div class="overflow-x-auto" {
            table class="min-w-full bg-gray-800 rounded shadow-md" {
                thead class="bg-gray-700" {
                    tr {
                        @for title in titles {
                            th class="py-2 px-4 text-left font-semibold text-gray-300" {(title)}
                        }
                    }
                }
                tbody {
                    @for row in items {
                        tr {
                            @for col in row {
                                td class="py-2 px-4 border-b border-gray-600 text-gray-200" {(col)}
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn title(s: impl Render) -> Markup {
    html! {
        h1 class="text-2xl font-semibold mb-4" {(s)}
    }
}

pub fn subtitle(s: impl Render) -> Markup {
    html! {
        h2 class="text-xl font-semibold mb-4" {(s)}
    }
}

pub fn error_alert(desc: impl Render) -> Markup {
    html! {
        div class="bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded relative mb-4" role="alert" {
            strong class="font-bold" {"Error: "}
            span {(desc)}
        }
    }
}

pub fn success_alert(desc: impl Render) -> Markup {
    html! {
        div class="bg-green-100 border border-green-400 text-green-700 px-4 py-3 rounded relative mb-4" role="status" {
            span {(desc)}
        }
    }
}

pub fn errors_list<'a>(errors: impl Iterator<Item = &'a str>) -> Markup {
    html! {
        div role="alert" class="bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded relative mb-4" {
            ul class="list-disc list-inside" {
                @for error in errors {
                    li {(error)}
                }
            }
        }
    }
}

pub fn form_element(id: &'static str, label: &'static str, input: Markup) -> Markup {
    html! {
        div class="mb-4" {
            label for=(id) class="block text-sm font-bold mb-2 text-gray-300" {(label)}
            (input)
        }
    }
}

const INPUT_CLASSES: &str = "shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600";

pub fn simple_form_element(
    id: &'static str,
    label: &'static str,
    required: bool,
    ty: Option<&'static str>,
    value: Option<&str>,
) -> Markup {
    form_element(
        id,
        label,
        html! {
            input required[required] type=(ty.unwrap_or("text")) id=(id) name=(id) value=[value] class=(INPUT_CLASSES);
        },
    )
}

pub fn checkbox(id: &'static str, label: &'static str, checked: bool) -> Markup {
    html! {
        div class="mb-2 flex items-center" {
            input type="checkbox" name=(id) id=(id) checked[checked] class="mr-2 leading-tight";
            label for=(id) class="text-gray-300 cursor-pointer" {(label)}
        }
    }
}

pub fn file_input(id: &'static str, label: &'static str) -> Markup {
    html! {
        label for=(id) class="block text-sm font-medium text-gray-400 mb-2" {(label)}
        input required type="file" name=(id) id=(id) accept=".csv" class="block w-full text-sm text-gray-300 file:mr-4 file:py-2 file:px-4 file:rounded file:border-0 file:text-sm file:font-semibold file:bg-violet-50 file:text-violet-700 hover:file:bg-violet-100 mb-4";
    }
}

pub fn form_submit_button(text: Option<&str>) -> Markup {
    html! {
        div class="flex items-center justify-between" {
            button type="submit" class="bg-blue-500 hover:bg-blue-700 font-bold py-2 px-4 rounded focus:outline-none focus:shadow-outline" {
                (text.unwrap_or("Submit"))
            }
        }
    }
}

pub fn render_nav(logged_in: bool) -> Markup {
    html! {
        nav class="w-full bg-gray-800 shadow-md mb-8 px-8 py-4 flex flex-row items-center justify-between" {
            a href=(View::Dashboard.path()) class="text-xl font-bold" {"Disco Bouncer"}
            @if logged_in {
                div class="flex flex-row items-center space-x-4" {
                    a href=(View::Dashboard.path()) class="hover:underline" {"Students"}
                    a href=(View::ManageUser.path()) class="hover:underline" {"Change Password"}
                    form method="post" action="/logout" {
                        button type="submit" class="bg-slate-600 hover:bg-slate-800 font-bold py-1 px-3 rounded" {"Logout"}
                    }
                }
            }
        }
    }
}
